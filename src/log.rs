// Messages meant for the user (as opposed to tracing, which is for
// developers) go through a WriteHandle, so they can be captured in tests.
// A failed write to the handle is not something we can report anywhere,
// so it is dropped.

// tt - TokenTree
// ($($arg:tt)*) Variable number of tts
#[macro_export]
macro_rules! write_errln {
    ($w:expr, $($arg:tt)*) => {{
        use std::io::Write;
        let _ = writeln!($w, $($arg)*);
    }};
}

#[macro_export]
macro_rules! write_err {
    ($w:expr, $($arg:tt)*) => {{
        use std::io::Write;
        let _ = write!($w, $($arg)*);
        let _ = $w.flush();
    }};
}
