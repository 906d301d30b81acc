//! Page route table with layout wrapping and the root redirect.
//!
//! # Design
//! Routes are generated from page file paths (`index.vue` → `/`,
//! `users/[id].vue` → `/users/:id`) and matched segment by segment. The root
//! path `/` is redirected once to the landing path before matching; every
//! other path is matched as given.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

pub const DEFAULT_LAYOUT: &str = "default";
const PAGE_EXTENSION: &str = ".vue";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("no route matches {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub name: String,
    pub layout: String,
}

impl Route {
    pub fn new(path: &str, name: &str) -> Self {
        Self {
            path: normalize(path),
            name: name.to_string(),
            layout: DEFAULT_LAYOUT.to_string(),
        }
    }

    pub fn with_layout(mut self, layout: &str) -> Self {
        self.layout = layout.to_string();
        self
    }

    fn segments(&self) -> impl Iterator<Item = Segment<'_>> {
        split(&self.path).map(|s| match s.strip_prefix(':') {
            Some(param) => Segment::Param(param),
            None => Segment::Static(s),
        })
    }
}

enum Segment<'a> {
    Static(&'a str),
    Param(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub route: Route,
    pub params: BTreeMap<String, String>,
    /// Set when the requested path was rewritten before matching.
    pub redirected_from: Option<String>,
}

impl ResolvedRoute {
    pub fn layout(&self) -> &str {
        &self.route.layout
    }
}

/// Build routes from page files relative to the pages directory.
///
/// Files without the page extension are skipped. `index` names its folder,
/// `[param]` becomes a dynamic segment, and route names join the segments
/// with `-` (`users/[id].vue` is named `users-id`).
pub fn routes_from_pages<S: AsRef<str>>(files: &[S]) -> Vec<Route> {
    let mut routes: Vec<Route> = files
        .iter()
        .filter_map(|file| {
            let file = file.as_ref().trim_start_matches("./").trim_start_matches('/');
            let stem = file.strip_suffix(PAGE_EXTENSION)?;

            let mut segments: Vec<String> = stem
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| match s.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                    Some(param) => format!(":{param}"),
                    None => s.to_string(),
                })
                .collect();
            if segments.last().map(String::as_str) == Some("index") {
                segments.pop();
            }

            let path = format!("/{}", segments.join("/"));
            let name = if segments.is_empty() {
                "index".to_string()
            } else {
                segments
                    .iter()
                    .map(|s| s.trim_start_matches(':'))
                    .collect::<Vec<_>>()
                    .join("-")
            };
            Some(Route::new(&path, &name))
        })
        .collect();
    routes.sort_by(|a, b| a.path.cmp(&b.path));
    routes
}

#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
    landing: String,
}

impl Router {
    pub fn new(routes: Vec<Route>, landing: &str) -> Self {
        Self {
            routes,
            landing: normalize(landing),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn landing(&self) -> &str {
        &self.landing
    }

    pub fn resolve(&self, path: &str) -> Result<ResolvedRoute, RouteError> {
        let requested = normalize(path);
        let (target, redirected_from) = if requested == "/" && self.landing != "/" {
            debug!(landing = %self.landing, "redirecting root");
            (self.landing.clone(), Some(requested))
        } else {
            (requested, None)
        };

        self.best_match(&target)
            .map(|(route, params)| ResolvedRoute {
                route: route.clone(),
                params,
                redirected_from,
            })
            .ok_or(RouteError::NotFound(target))
    }

    /// Among matching routes, prefer the one with the most static segments.
    fn best_match(&self, path: &str) -> Option<(&Route, BTreeMap<String, String>)> {
        let wanted: Vec<&str> = split(path).collect();
        self.routes
            .iter()
            .filter_map(|route| {
                let segments: Vec<Segment<'_>> = route.segments().collect();
                if segments.len() != wanted.len() {
                    return None;
                }
                let mut params = BTreeMap::new();
                let mut statics = 0;
                for (segment, actual) in segments.iter().zip(&wanted) {
                    match segment {
                        Segment::Static(s) if s == actual => statics += 1,
                        Segment::Static(_) => return None,
                        Segment::Param(name) => {
                            params.insert(name.to_string(), actual.to_string());
                        }
                    }
                }
                Some((statics, route, params))
            })
            .max_by_key(|(statics, _, _)| *statics)
            .map(|(_, route, params)| (route, params))
    }
}

/// Strip query and fragment, collapse to a leading-slash path without a
/// trailing slash.
fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let joined = split(path).collect::<Vec<_>>().join("/");
    format!("/{joined}")
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
