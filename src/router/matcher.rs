/// Result of a check made by a [Matcher]
/// [MatcherResult::OK] means the the request can be handled
/// [MatcherResult::UriOnly] means the request should have be handled, but the method is incorrect
/// [MatcherResult::KO] means the request cannot be handled
#[derive(Debug, PartialEq)]
pub enum MatcherResult {
    OK,
    UriOnly,
    KO,
}

/// Trait to implement to be able to tell whether a [crate::router::Handler] can handle a query or not
pub trait Matcher: Sync + Send {
    fn matches(&self, request: &hyper::Request<hyper::Body>) -> MatcherResult;
}

#[derive(Debug)]
pub enum MatcherBuilderError {
    IncorrectUri,
    IncorrectMethod,
}

enum UriMatcher {
    All,
    Regex(regex::Regex),
}

enum MethodMatcher {
    All,
    Exact(hyper::Method),
}

struct MatcherImpl {
    method_matcher: MethodMatcher,
    uri_matcher: UriMatcher,
}

impl Matcher for MatcherImpl {
    fn matches(&self, request: &hyper::Request<hyper::Body>) -> MatcherResult {
        let uri_match = match &self.uri_matcher {
            UriMatcher::All => true,
            UriMatcher::Regex(re) => re.is_match(request.uri().path()),
        };

        if !uri_match {
            return MatcherResult::KO;
        }

        let method_match = match &self.method_matcher {
            MethodMatcher::All => true,
            MethodMatcher::Exact(method) => request.method() == method,
        };

        if method_match {
            MatcherResult::OK
        } else {
            MatcherResult::UriOnly
        }
    }
}

pub struct MatcherBuilder {
    method_matcher: Option<MethodMatcher>,
    uri_matcher: Option<UriMatcher>,
}

pub fn builder() -> MatcherBuilder {
    MatcherBuilder::new()
}

impl MatcherBuilder {
    fn new() -> MatcherBuilder {
        MatcherBuilder {
            method_matcher: Some(MethodMatcher::All),
            uri_matcher: Some(UriMatcher::All),
        }
    }

    pub fn regex_path(mut self, regex: &str) -> MatcherBuilder {
        let regex = regex::Regex::new(regex);
        self.uri_matcher = match regex {
            Ok(regex) => Some(UriMatcher::Regex(regex)),
            _ => None,
        };
        self
    }

    pub fn with_method<T>(mut self, method: T) -> MatcherBuilder
    where
        hyper::Method: std::convert::TryFrom<T>,
    {
        let method: std::result::Result<hyper::Method, _> = std::convert::TryFrom::try_from(method);
        self.method_matcher = match method {
            Ok(method) => Some(MethodMatcher::Exact(method)),
            _ => None,
        };
        self
    }

    pub fn build(self) -> Result<Box<dyn Matcher>, MatcherBuilderError> {
        match self.method_matcher {
            None => Err(MatcherBuilderError::IncorrectMethod),
            Some(method_matcher) => match self.uri_matcher {
                None => Err(MatcherBuilderError::IncorrectUri),
                Some(uri_matcher) => Ok(Box::new(MatcherImpl {
                    method_matcher,
                    uri_matcher,
                })),
            },
        }
    }
}
