use regex::Regex;

/// A behavior check for one task family.
///
/// `extract` pulls the expected parameter out of the task prompt and `render`
/// appends a `main` to the candidate source that calls `symbol` and asserts on
/// the result.
pub trait BehaviorProbe: Send + Sync {
    fn family(&self) -> &str;
    fn extract(&self, prompt: &str) -> Option<i64>;
    fn render(&self, source: &str, symbol: &str, param: i64) -> String;
}

fn first_capture(pattern: &Regex, prompt: &str, group: usize) -> Option<i64> {
    pattern.captures(prompt)?.get(group)?.as_str().parse().ok()
}

/// "adds K to input": `f(7) == 7 + K`.
pub struct ClosureShiftProbe {
    pattern: Regex,
}

impl ClosureShiftProbe {
    pub const FAMILY: &'static str = "closure_shift_const";

    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(r"adds\s+(\d+)\s+to\s+input")?,
        })
    }
}

impl BehaviorProbe for ClosureShiftProbe {
    fn family(&self) -> &str {
        Self::FAMILY
    }

    fn extract(&self, prompt: &str) -> Option<i64> {
        first_capture(&self.pattern, prompt, 1)
    }

    fn render(&self, source: &str, symbol: &str, param: i64) -> String {
        format!(
            "{source}\n\nfn main() {{\n    let got = {symbol}(7);\n    assert_eq!(got, {});\n}}\n",
            i128::from(param) + 7
        )
    }
}

/// "... returns N.": `f(Ok(123)) == 123` and `f(Err(..)) == N`.
pub struct ResultUnwrapOrProbe {
    pattern: Regex,
}

impl ResultUnwrapOrProbe {
    pub const FAMILY: &'static str = "result_unwrap_or_const";

    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(r"returns\s+(\d+)\.")?,
        })
    }
}

impl BehaviorProbe for ResultUnwrapOrProbe {
    fn family(&self) -> &str {
        Self::FAMILY
    }

    fn extract(&self, prompt: &str) -> Option<i64> {
        first_capture(&self.pattern, prompt, 1)
    }

    fn render(&self, source: &str, symbol: &str, param: i64) -> String {
        format!(
            "{source}\n\nfn main() {{\n    let ok = {symbol}(Ok(123));\n    assert_eq!(ok, 123);\n    let err = {symbol}(Err(String::from(\"x\")));\n    assert_eq!(err, {param});\n}}\n"
        )
    }
}

/// "vec![a, b, c]": popping yields `Some(c)`.
pub struct VecPopProbe {
    pattern: Regex,
}

impl VecPopProbe {
    pub const FAMILY: &'static str = "vec_pop_basic";

    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(r"vec!\[(\d+),\s*(\d+),\s*(\d+)\]")?,
        })
    }
}

impl BehaviorProbe for VecPopProbe {
    fn family(&self) -> &str {
        Self::FAMILY
    }

    fn extract(&self, prompt: &str) -> Option<i64> {
        first_capture(&self.pattern, prompt, 3)
    }

    fn render(&self, source: &str, symbol: &str, param: i64) -> String {
        format!("{source}\n\nfn main() {{\n    let got = {symbol}();\n    assert_eq!(got, Some({param}));\n}}\n")
    }
}
