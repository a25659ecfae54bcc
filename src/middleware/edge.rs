//! Request-boundary interception: the guard applied at the router root,
//! before any per-route handling, limited to a set of path patterns.

/// Glob-style path matcher for the edge layer.
///
/// Patterns are segment-wise: `*` matches exactly one path segment, `**`
/// matches any remainder (including nothing). `/dashboard/**` protects the
/// whole subtree; `/orgs/*/settings` protects one level of nesting.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    patterns: Vec<String>,
}

impl RouteMatcher {
    #[must_use]
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let segments: Vec<&str> = split_segments(path);
        self.patterns
            .iter()
            .any(|pattern| match_segments(&split_segments(pattern), &segments))
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    let Some((head, rest)) = pattern.split_first() else {
        return path.is_empty();
    };
    match *head {
        "**" => (0..=path.len()).any(|skip| match_segments(rest, &path[skip..])),
        "*" => path
            .split_first()
            .is_some_and(|(_, tail)| match_segments(rest, tail)),
        literal => path
            .split_first()
            .is_some_and(|(seg, tail)| *seg == literal && match_segments(rest, tail)),
    }
}
