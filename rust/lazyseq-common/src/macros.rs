/// Unwraps a `Result` inside a function returning `Option<Result<T>>`.
///
/// `Ok(t)` yields `t`; `Err(e)` returns `Some(Err(e))` from the enclosing
/// function. Cursor `next()` implementations use this to surface a failed
/// `can_produce` or `get` as the cursor's next item.
#[macro_export]
macro_rules! try_or_ret_some_err {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => {
                return Some(Err(err));
            }
        }
    };
}
