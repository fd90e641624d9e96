
/// Composes single-argument functions from right to left.
///
/// `compose(vec![f, g, h])` returns a function equivalent to `|x| f(g(h(x)))`.
/// With no functions the result is the identity function, and a single function is returned as is.
pub fn compose<'a, T: 'a>(funcs: Vec<Box<dyn Fn(T) -> T + 'a>>) -> Box<dyn Fn(T) -> T + 'a> {
    funcs
        .into_iter()
        .reduce(|a, b| -> Box<dyn Fn(T) -> T + 'a> { Box::new(move |x: T| a(b(x))) })
        .unwrap_or_else(|| -> Box<dyn Fn(T) -> T + 'a> { Box::new(|x: T| x) })
}

/// Composes functions from right to left, allowing each function to have its own types.
///
/// `compose!(f, g, h)` expands to a closure equivalent to `|x| f(g(h(x)))`.
/// The rightmost function may take a tuple to receive several arguments.
///
/// ```
/// let f = oneway::compose!(|x: i32| x + 1, |x: i32| x * 2, |s: &str| s.len() as i32);
/// assert_eq!(f("abc"), 7);
/// let id = oneway::compose!();
/// assert_eq!(id(5), 5);
/// ```
#[macro_export]
macro_rules! compose {
    () => {
        |x| x
    };
    ($f:expr $(,)?) => {
        $f
    };
    ($f:expr, $($rest:expr),+ $(,)?) => {{
        let f = $f;
        let rest = $crate::compose!($($rest),+);
        move |x| f(rest(x))
    }};
}
