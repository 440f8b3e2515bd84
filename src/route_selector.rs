use crate::descriptor::RouteDescriptor;
use log::debug;

/// Prefix selecting every API route when none is given
pub const DEFAULT_PREFIX: &str = "api";

/// Keep the routes under `prefix`, in order.
///
/// Slashes around both the URI and the prefix are ignored, so prefix `api`
/// keeps `api` and `api/users` but not `api2/users`. Routes served by inline
/// handlers carry no descriptor and are dropped.
pub fn select<'a>(routes: &'a [RouteDescriptor], prefix: &str) -> Vec<&'a RouteDescriptor> {
    let prefix = prefix.trim_matches('/');

    routes
        .iter()
        .filter(|route| {
            if route.is_closure() {
                debug!("Skipping inline handler route {}", route.uri);
                return false;
            }
            is_under(&route.uri, prefix)
        })
        .collect()
}

/// `uri` is the prefix itself or one of its sub-paths
fn is_under(uri: &str, prefix: &str) -> bool {
    match uri.trim_matches('/').strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.len() > 1 && rest.starts_with('/'),
        None => false,
    }
}
