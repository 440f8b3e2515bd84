//! Documentation comment parser.
//!
//! Handlers can document query parameters and responses inside their doc
//! comment instead of (or in addition to) structured annotations:
//!
//! ```text
//! /**
//!  * List users.
//!  *
//!  * @Query(name=page, required=true)
//!  * @OpenApi\Response(statusCode=200, response={
//!  *     "data": [{"id": 1, "name": "Ada"}]
//!  * })
//!  * @Response(statusCode=201, response=App\Models\User)
//!  */
//! ```
//!
//! The comment is first split into a [`DocBlock`] of text and tag nodes.
//! `Query` and `Response` tags (bare or under the `OpenApi\` namespace) are
//! then turned into [`DocTag`]s whose arguments are kept by position only.

use crate::descriptor::{Catalog, HandlerId, QueryParam, ResponsePayload};
use crate::error::{DefinitionError, Result};
use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

/// Positional arguments of a `Query` or `Response` tag; the last one absorbs
/// any remaining commas
const TAG_ARITY: usize = 2;

static RE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(@[A-Za-z_][A-Za-z0-9_\\-]*)(.*)$").unwrap());

/// One node of a documentation block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocNode {
    /// Free text line
    Text(String),
    /// `@Name value`, where the value may continue over following lines
    Tag(DocTagNode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTagNode {
    /// Tag name including the leading `@`
    pub name: String,
    pub value: String,
}

/// A documentation comment split into nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocBlock {
    pub nodes: Vec<DocNode>,
}

impl DocBlock {
    /// Tokenize a doc comment. Comment delimiters and leading `*` are removed;
    /// a tag value runs until the next tag or blank line.
    pub fn parse(doc: &str) -> Self {
        let mut nodes = Vec::new();
        let mut current: Option<DocTagNode> = None;

        for raw_line in doc.lines() {
            let line = clean_line(raw_line);

            if let Some(caps) = RE_TAG.captures(line) {
                if let Some(tag) = current.take() {
                    nodes.push(DocNode::Tag(tag));
                }
                current = Some(DocTagNode {
                    name: caps[1].to_string(),
                    value: caps[2].trim().to_string(),
                });
                continue;
            }

            if line.is_empty() {
                if let Some(tag) = current.take() {
                    nodes.push(DocNode::Tag(tag));
                }
                continue;
            }

            match current.as_mut() {
                Some(tag) => {
                    tag.value.push('\n');
                    tag.value.push_str(line);
                }
                None => nodes.push(DocNode::Text(line.to_string())),
            }
        }

        if let Some(tag) = current {
            nodes.push(DocNode::Tag(tag));
        }

        Self { nodes }
    }

    pub fn tags(&self) -> impl Iterator<Item = &DocTagNode> {
        self.nodes.iter().filter_map(|node| match node {
            DocNode::Tag(tag) => Some(tag),
            DocNode::Text(_) => None,
        })
    }
}

fn clean_line(line: &str) -> &str {
    let mut line = line.trim();
    if let Some(rest) = line.strip_prefix("/**") {
        line = rest;
    } else if let Some(rest) = line.strip_prefix("/*") {
        line = rest;
    }
    if let Some(rest) = line.strip_suffix("*/") {
        line = rest;
    }
    let line = line.trim_start();
    line.strip_prefix('*').unwrap_or(line).trim()
}

/// Tags the generator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Query,
    Response,
}

impl TagKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "@Query" | "@OpenApi\\Query" => Some(TagKind::Query),
            "@Response" | "@OpenApi\\Response" => Some(TagKind::Response),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Query => "Query",
            TagKind::Response => "Response",
        }
    }
}

/// A recognised tag with its positional argument values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTag {
    pub kind: TagKind,
    /// Right-hand side of each `key=value` argument; `None` when a piece has no `=`
    pub arguments: Vec<Option<String>>,
}

impl DocTag {
    fn argument(&self, position: usize) -> Option<&str> {
        self.arguments.get(position).and_then(|arg| arg.as_deref())
    }
}

/// Parse a documentation comment into its `Query` and `Response` tags, in order.
pub fn parse(doc: &str) -> Vec<DocTag> {
    DocBlock::parse(doc)
        .tags()
        .filter_map(|node| {
            let kind = TagKind::from_name(&node.name)?;
            Some(DocTag {
                kind,
                arguments: split_arguments(&node.value, TAG_ARITY),
            })
        })
        .collect()
}

fn split_arguments(value: &str, arity: usize) -> Vec<Option<String>> {
    let value = value.trim();
    let inner = value
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(value);

    inner
        .splitn(arity, ',')
        .map(|piece| piece.split_once('=').map(|(_, rhs)| rhs.trim().to_string()))
        .collect()
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(value)
}

/// Query parameters declared by `@Query(name=..., required=...)` tags.
pub fn query_parameters(tags: &[DocTag], handler: &HandlerId) -> Result<Vec<QueryParam>> {
    tags.iter()
        .filter(|tag| tag.kind == TagKind::Query)
        .map(|tag| -> Result<QueryParam> {
            let name = tag
                .argument(0)
                .map(unquote)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| incomplete(handler, tag.kind, "name"))?;
            Ok(QueryParam {
                name: name.to_string(),
                required: tag.argument(1).map(unquote) == Some("true"),
            })
        })
        .collect()
}

/// Responses declared by `@Response(statusCode=..., response=...)` tags, keyed by status code.
///
/// The second argument names a known model (a trailing `[]` makes it a list of
/// models) or holds a JSON document. A later tag for the same status code
/// replaces an earlier one.
pub fn responses<C: Catalog + ?Sized>(
    tags: &[DocTag],
    catalog: &C,
    handler: &HandlerId,
) -> Result<IndexMap<String, ResponsePayload>> {
    let mut responses = IndexMap::new();

    for tag in tags.iter().filter(|tag| tag.kind == TagKind::Response) {
        let status_code = tag
            .argument(0)
            .map(unquote)
            .filter(|status| !status.is_empty())
            .ok_or_else(|| incomplete(handler, tag.kind, "statusCode"))?
            .to_string();
        let payload = tag.argument(1).unwrap_or_default();

        let payload = resolve_payload(payload, catalog).ok_or_else(|| {
            DefinitionError::InvalidJsonResponse {
                handler: handler.to_string(),
                status_code: status_code.clone(),
            }
        })?;

        debug!("{}: doc response {} -> {:?}", handler, status_code, payload);
        responses.insert(status_code, payload);
    }

    Ok(responses)
}

fn resolve_payload<C: Catalog + ?Sized>(payload: &str, catalog: &C) -> Option<ResponsePayload> {
    if let Some(model) = payload.strip_suffix("[]") {
        if catalog.model(model).is_some() {
            return Some(ResponsePayload::ModelList(model.to_string()));
        }
    }
    if catalog.model(payload).is_some() {
        return Some(ResponsePayload::Model(payload.to_string()));
    }

    let json: String = payload.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    serde_json::from_str(&json).ok().map(ResponsePayload::Raw)
}

fn incomplete(handler: &HandlerId, kind: TagKind, argument: &str) -> DefinitionError {
    DefinitionError::IncompleteDocTag {
        handler: handler.to_string(),
        tag: kind.as_str().to_string(),
        argument: argument.to_string(),
    }
}
