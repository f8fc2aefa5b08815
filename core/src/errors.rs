use thiserror::Error;

pub type Result<T> = std::result::Result<T, ValcorCoreError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ValcorCoreError {
    #[error("parameter name '{0}' is bound more than once")]
    DuplicateParameterName(String),
    #[error("invalid pattern '{pattern}' in regex predicate")]
    InvalidRegexPredicate {
        pattern: String,
        source: regex::Error,
    },
    #[error("a set-membership predicate needs at least one element")]
    EmptyValueSet,
    #[error("a disjunction needs at least one branch")]
    EmptyDisjunction,
}
