// Declares a unit-like error with a fixed message and HTTP status.
macro_rules! impl_error {
    ($ty:ident, $message:expr, $status:expr) => {
        #[doc = concat!("The error type of `", stringify!($ty), "`.")]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $ty {
            _priv: (),
        }

        impl $ty {
            pub(crate) const fn new() -> Self {
                Self { _priv: () }
            }
        }

        impl core::fmt::Display for $ty {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str($message)
            }
        }

        impl core::error::Error for $ty {}

        impl $crate::error::HttpError for $ty {
            fn status(&self) -> http::StatusCode {
                $status
            }
        }
    };
}
