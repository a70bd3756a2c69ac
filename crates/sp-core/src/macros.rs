/// Declare an AST struct with the derives every node carries.
macro_rules! common_struct {
    ($(#[$attr:meta])* $vis:vis struct $name:ident { $($body:tt)* }) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        $vis struct $name { $($body)* }
    };
}

/// Declare an AST enum with the derives every node carries.
macro_rules! common_enum {
    ($(#[$attr:meta])* $vis:vis enum $name:ident { $($body:tt)* }) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        $vis enum $name { $($body)* }
    };
}

/// Return early with a corrupt-input error when the condition does not hold
#[macro_export]
macro_rules! ensure_input {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            return Err($crate::error::Error::CorruptInput(format!($($arg)*)));
        }
    };
}
