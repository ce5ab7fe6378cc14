use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Home,
    TaskDetails(String),
    NotFound,
}

impl Route {
    /// Matches a path against the route table. Anything unmatched goes to `/not-found`.
    pub fn parse(path: &str) -> Self {
        let path = path.split(|c| c == '?' || c == '#').next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Route::Home,
            "/login" => Route::Login,
            "/not-found" => Route::NotFound,
            _ => match trimmed.strip_prefix("/tasks/") {
                Some(id) if !id.is_empty() && !id.contains('/') => {
                    Route::TaskDetails(id.to_string())
                }
                _ => Route::NotFound,
            },
        }
    }

    pub fn requires_session(&self) -> bool {
        matches!(self, Route::Home | Route::TaskDetails(_))
    }

    /// Where a visit to `self` actually lands given whether a session is active.
    pub fn guard(self, has_session: bool) -> Route {
        match self {
            route if route.requires_session() && !has_session => Route::Login,
            Route::Login if has_session => Route::Home,
            route => route,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Login => f.write_str("/login"),
            Route::Home => f.write_str("/"),
            Route::TaskDetails(id) => write!(f, "/tasks/{}", id),
            Route::NotFound => f.write_str("/not-found"),
        }
    }
}
