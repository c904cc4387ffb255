//! [`Error`]-related definitions.

use std::fmt;

use derive_more::Error as StdError;
use juniper::IntoFieldError;
use service::infra::database;
use tracerr::{Trace, Traced};

/// Defines a new error enum convertible into an API [`Error`].
///
/// Every variant carries its [`Code`], [`http::StatusCode`] and message,
/// the message also being used as its [`Display`] and documentation.
///
/// [`Display`]: std::fmt::Display
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        #[doc = concat!("API error of `", stringify!($name), "` kind.")]
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error,
            Eq,
            PartialEq,
        )]
        pub enum $name {
            $(
                #[doc = $message]
                #[display($message)]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                let (code, status) = match err {
                    $( $name::$variant => (
                        $code,
                        ::http::StatusCode::$status,
                    ), )*
                };
                Self::new(code, status, err)
            }
        }
    };
}

/// Error returned by the GraphQL API.
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// Machine-readable [`Code`] of this [`Error`].
    pub code: Code,

    /// [`http::StatusCode`] to respond with on this [`Error`].
    pub status_code: http::StatusCode,

    /// [`Trace`] of where this [`Error`] originated, if any.
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// Human-readable message of this [`Error`].
    pub message: String,
}

impl Error {
    /// Creates a new [`Error`] without a [`Trace`].
    #[must_use]
    pub fn new(
        code: Code,
        status_code: http::StatusCode,
        message: impl ToString,
    ) -> Self {
        Self {
            code,
            status_code,
            backtrace: None,
            message: message.to_string(),
        }
    }

    /// Creates a new [`Error`] not meant to be handled by API clients.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self::new(
            "INTERNAL_SERVER_ERROR",
            http::StatusCode::INTERNAL_SERVER_ERROR,
            msg.to_string(),
        )
    }

    /// Returns GraphQL extensions describing this [`Error`].
    fn extensions<S: From<String>>(&self) -> juniper::Value<S> {
        let frames = self
            .backtrace
            .iter()
            .flat_map(|trace| trace.iter())
            .map(|frame| juniper::Value::scalar(frame.to_string()))
            .collect();

        let mut ext = juniper::Object::with_capacity(2);
        _ = ext.add_field("code", juniper::Value::scalar(self.code.to_owned()));
        _ = ext.add_field("backtrace", juniper::Value::list(frames));
        juniper::Value::object(ext)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: {}", self.code, self.message)?;
        if let Some(trace) = &self.backtrace {
            write!(f, "{trace}")?;
        }
        Ok(())
    }
}

impl<S> IntoFieldError<S> for Error
where
    S: From<String>,
{
    fn into_field_error(self) -> juniper::FieldError<S> {
        let ext = self.extensions();
        juniper::FieldError::new(self.message, ext)
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        None
    }
}

#[cfg(test)]
mod spec {
    use juniper::{DefaultScalarValue, IntoFieldError};

    use super::Error;

    crate::define_error! {
        enum TestError {
            #[code = "NOT_READY"]
            #[status = SERVICE_UNAVAILABLE]
            #[message = "Not ready yet"]
            NotReady,
        }
    }

    #[test]
    fn defines_errors() {
        let err = Error::from(TestError::NotReady);

        assert_eq!(err.code, "NOT_READY");
        assert_eq!(err.status_code, http::StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "[NOT_READY]: Not ready yet");
    }

    #[test]
    fn exposes_code_in_extensions() {
        let field = IntoFieldError::<DefaultScalarValue>::into_field_error(
            Error::from(TestError::NotReady),
        );

        assert_eq!(field.message(), "Not ready yet");
        assert_eq!(
            field
                .extensions()
                .as_object_value()
                .and_then(|o| o.get_field_value("code"))
                .and_then(|v| v.as_string_value()),
            Some("NOT_READY"),
        );
    }
}
