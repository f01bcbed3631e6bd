use std::fmt;

use rdx_core::{Failure, Phase};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    None,
    Timeout,
    ToolInvocation,
    // transform only
    IronParseError,
    OxidationError,
    TransformOther,
    // compile and test
    NameResolution,
    WrongSignatureOrCall,
    ClosureReturnShape,
    TypeMismatch,
    ParseError,
    MissingFunction,
    UnsupportedFamily,
    MissingParameter,
    BehaviorAssertion,
    Other,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::None => "none",
            FailureClass::Timeout => "timeout",
            FailureClass::ToolInvocation => "tool_invocation",
            FailureClass::IronParseError => "iron_parse_error",
            FailureClass::OxidationError => "oxidation_error",
            FailureClass::TransformOther => "transform_other",
            FailureClass::NameResolution => "name_resolution",
            FailureClass::WrongSignatureOrCall => "wrong_signature_or_call",
            FailureClass::ClosureReturnShape => "closure_return_shape",
            FailureClass::TypeMismatch => "type_mismatch",
            FailureClass::ParseError => "parse_error",
            FailureClass::MissingFunction => "missing_function",
            FailureClass::UnsupportedFamily => "unsupported_family",
            FailureClass::MissingParameter => "missing_parameter",
            FailureClass::BehaviorAssertion => "behavior_assertion",
            FailureClass::Other => "other",
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_parse_error(text: &str) -> bool {
    text.contains("unexpectedtoken") || text.contains("parse error")
}

fn is_assertion(text: &str) -> bool {
    let failed_after_assertion = text
        .find("assertion")
        .is_some_and(|at| text[at..].contains("failed"));
    failed_after_assertion || text.contains("panicked")
}

/// Map a diagnostic to a label. Pure; the first matching rule wins.
///
/// Transform diagnostics come from the transformation tool and use a narrower
/// label set than compiler and test diagnostics.
pub fn classify(text: &str, phase: Phase) -> FailureClass {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return FailureClass::None;
    }
    if text.contains("timed out after") {
        return FailureClass::Timeout;
    }
    if text.contains("failed to spawn") || text.contains("failed to wait for") || text.contains("scratch directory:") {
        return FailureClass::ToolInvocation;
    }

    if phase == Phase::Transform {
        if is_parse_error(&text) {
            return FailureClass::IronParseError;
        }
        if text.contains("oxidation failed") {
            return FailureClass::OxidationError;
        }
        return FailureClass::TransformOther;
    }

    if text.contains("expected value, found crate") || text.contains("cannot find") {
        return FailureClass::NameResolution;
    }
    if text.contains("this function takes") && text.contains("argument") {
        return FailureClass::WrongSignatureOrCall;
    }
    if text.contains("found closure") {
        return FailureClass::ClosureReturnShape;
    }
    if text.contains("mismatched types") {
        return FailureClass::TypeMismatch;
    }
    if is_parse_error(&text) {
        return FailureClass::ParseError;
    }
    if text.contains("no function definition found") {
        return FailureClass::MissingFunction;
    }
    if text.contains("unsupported family") {
        return FailureClass::UnsupportedFamily;
    }
    if text.contains("no behavior parameter") {
        return FailureClass::MissingParameter;
    }
    if is_assertion(&text) {
        return FailureClass::BehaviorAssertion;
    }
    FailureClass::Other
}

/// Like [`classify`] for a stage known to have failed: blank text falls into
/// the phase's catch-all bucket instead of `none`.
pub fn classify_failed(text: &str, phase: Phase) -> FailureClass {
    match classify(text, phase) {
        FailureClass::None if phase == Phase::Transform => FailureClass::TransformOther,
        FailureClass::None => FailureClass::Other,
        class => class,
    }
}

pub fn classify_failure(failure: &Failure) -> FailureClass {
    classify_failed(&failure.detail, failure.stage.phase())
}
