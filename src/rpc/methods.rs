//! The method table and the standard methods.
//!
//! A [`MethodTable`] maps method names to pure handlers. It is built once at
//! startup, never mutated, and shared by every session without locking.
//!
//! Handlers never see raw `params`. [`MethodEntry::bind`] first turns the
//! request's array or object into an ordered [`Args`] list matching the
//! entry's declared parameter names:
//!
//! - An object binds by name. Missing and unknown names are rejected.
//! - An array binds positionally and must match the parameter count, unless
//!   the entry uses [`Binding::Collect`], in which case the whole array becomes
//!   the single argument (this is how `sort` receives its list).

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};
use thiserror::Error;

/// A method implementation.
pub type Handler = fn(&Args) -> Result<Value, InvocationError>;

/// Failures raised while binding or running a handler.
///
/// The `Display` text is sent to the client verbatim.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvocationError {
    /// `params` was neither an array nor an object.
    #[error("{method}: params must be an array or an object")]
    InvalidParams {
        /// Method being invoked.
        method: String,
    },

    /// Positional call with the wrong number of arguments.
    #[error(
        "{method}() takes {expected} positional {} but {given} {} given",
        argument_noun(.expected),
        was_or_were(.given)
    )]
    ArgumentCount {
        /// Method being invoked.
        method: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        given: usize,
    },

    /// Keyword call without a required name.
    #[error("{method}() missing required argument: '{name}'")]
    MissingArgument {
        /// Method being invoked.
        method: String,
        /// Missing parameter name.
        name: String,
    },

    /// Keyword call with a name the method does not declare.
    #[error("{method}() got an unexpected keyword argument '{name}'")]
    UnexpectedArgument {
        /// Method being invoked.
        method: String,
        /// Offending key.
        name: String,
    },

    /// Argument of the wrong JSON kind.
    #[error("argument '{name}' must be {expected}")]
    TypeMismatch {
        /// Parameter name.
        name: String,
        /// Expected kind, e.g. "a number".
        expected: &'static str,
    },

    /// `divide` with a zero divisor.
    #[error("division by zero")]
    DivisionByZero,

    /// `nroot` with `n <= 0`.
    #[error("root index must be a positive number")]
    NonPositiveRoot,

    /// `sort` with fewer than two strings.
    #[error("sort requires at least two strings")]
    SortTooShort,

    /// Integer result outside the 64-bit range.
    #[error("integer overflow")]
    Overflow,

    /// Result that JSON cannot represent (NaN or infinity).
    #[error("math domain error")]
    Domain,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // thiserror passes fields by reference
const fn argument_noun(count: &usize) -> &'static str {
    if *count == 1 {
        "argument"
    } else {
        "arguments"
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)] // thiserror passes fields by reference
const fn was_or_were(count: &usize) -> &'static str {
    if *count == 1 {
        "was"
    } else {
        "were"
    }
}

/// How an array of params is bound to a method's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Each array element is one positional argument.
    Spread,
    /// The whole array is the method's single argument.
    Collect,
}

/// One entry of the method table.
#[derive(Debug, Clone)]
pub struct MethodEntry {
    /// Method name as it appears in requests.
    pub name: &'static str,
    /// Declared parameter names, in positional order.
    pub params: &'static [&'static str],
    /// Array binding rule.
    pub binding: Binding,
    /// The implementation.
    pub handler: Handler,
}

impl MethodEntry {
    /// Binds raw request params to this method's parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the params shape or argument names/count do not
    /// match the method's declaration.
    pub fn bind(&self, params: Value) -> Result<Args, InvocationError> {
        let values = match params {
            Value::Object(mut map) => {
                let mut values = Vec::with_capacity(self.params.len());
                for name in self.params {
                    let value =
                        map.remove(*name)
                            .ok_or_else(|| InvocationError::MissingArgument {
                                method: self.name.to_string(),
                                name: (*name).to_string(),
                            })?;
                    values.push(value);
                }
                if let Some(extra) = map.keys().next() {
                    return Err(InvocationError::UnexpectedArgument {
                        method: self.name.to_string(),
                        name: extra.clone(),
                    });
                }
                values
            }
            Value::Array(items) => match self.binding {
                Binding::Collect => vec![Value::Array(items)],
                Binding::Spread => {
                    if items.len() != self.params.len() {
                        return Err(InvocationError::ArgumentCount {
                            method: self.name.to_string(),
                            expected: self.params.len(),
                            given: items.len(),
                        });
                    }
                    items
                }
            },
            _ => {
                return Err(InvocationError::InvalidParams {
                    method: self.name.to_string(),
                })
            }
        };

        Ok(Args {
            names: self.params,
            values,
        })
    }

    /// Binds `params` and runs the handler.
    ///
    /// # Errors
    ///
    /// Returns binding errors and any error raised by the handler.
    pub fn invoke(&self, params: Value) -> Result<Value, InvocationError> {
        let args = self.bind(params)?;
        (self.handler)(&args)
    }
}

/// Arguments bound to a method's declared parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    names: &'static [&'static str],
    values: Vec<Value>,
}

impl Args {
    fn name(&self, index: usize) -> String {
        self.names
            .get(index)
            .map_or_else(|| format!("#{index}"), |n| (*n).to_string())
    }

    fn value(&self, index: usize) -> Result<&Value, InvocationError> {
        self.values
            .get(index)
            .ok_or_else(|| InvocationError::MissingArgument {
                method: "handler".to_string(),
                name: self.name(index),
            })
    }

    /// Reads argument `index` as a number.
    ///
    /// # Errors
    ///
    /// Returns [`InvocationError::TypeMismatch`] for non-numbers.
    pub fn number(&self, index: usize) -> Result<Number, InvocationError> {
        Number::from_value(self.value(index)?).ok_or_else(|| InvocationError::TypeMismatch {
            name: self.name(index),
            expected: "a number",
        })
    }

    /// Reads argument `index` as a string.
    ///
    /// # Errors
    ///
    /// Returns [`InvocationError::TypeMismatch`] for non-strings.
    pub fn string(&self, index: usize) -> Result<&str, InvocationError> {
        self.value(index)?
            .as_str()
            .ok_or_else(|| InvocationError::TypeMismatch {
                name: self.name(index),
                expected: "a string",
            })
    }

    /// Reads argument `index` as an array of strings.
    ///
    /// # Errors
    ///
    /// Returns [`InvocationError::TypeMismatch`] unless every element is a string.
    pub fn strings(&self, index: usize) -> Result<Vec<&str>, InvocationError> {
        let mismatch = || InvocationError::TypeMismatch {
            name: self.name(index),
            expected: "an array of strings",
        };
        self.value(index)?
            .as_array()
            .ok_or_else(mismatch)?
            .iter()
            .map(|item| item.as_str().ok_or_else(mismatch))
            .collect()
    }
}

/// A JSON number, keeping integers and floats apart.
///
/// Integers are held as `i128` so that every integer JSON can carry here
/// (the union of the `i64` and `u64` ranges) stays integral through
/// arithmetic. Results outside that union are reported as overflow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Integral value.
    Int(i128),
    /// Floating-point value.
    Float(f64),
}

impl Number {
    /// Reads a JSON number.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        value
            .as_i64()
            .map(i128::from)
            .or_else(|| value.as_u64().map(i128::from))
            .map(Self::Int)
            .or_else(|| value.as_f64().map(Self::Float))
    }

    /// Returns the value as a float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Same widening JSON clients apply
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    /// Returns `true` for integer or floating zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        match self {
            Self::Int(i) => i == 0,
            Self::Float(f) => f == 0.0,
        }
    }

    /// Converts to a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`InvocationError::Overflow`] for integers outside the `i64`
    /// and `u64` ranges and [`InvocationError::Domain`] for NaN and infinities.
    pub fn into_value(self) -> Result<Value, InvocationError> {
        match self {
            Self::Int(i) => i64::try_from(i)
                .map(Value::from)
                .or_else(|_| u64::try_from(i).map(Value::from))
                .map_err(|_| InvocationError::Overflow),
            Self::Float(f) if f.is_finite() => Ok(Value::from(f)),
            Self::Float(_) => Err(InvocationError::Domain),
        }
    }
}

/// Integer arithmetic when both sides are integers, float arithmetic otherwise.
fn arithmetic(
    args: &Args,
    int_op: fn(i128, i128) -> Option<i128>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, InvocationError> {
    let x = args.number(0)?;
    let y = args.number(1)?;
    let result = match (x, y) {
        (Number::Int(a), Number::Int(b)) => {
            Number::Int(int_op(a, b).ok_or(InvocationError::Overflow)?)
        }
        _ => Number::Float(float_op(x.as_f64(), y.as_f64())),
    };
    result.into_value()
}

fn add(args: &Args) -> Result<Value, InvocationError> {
    arithmetic(args, i128::checked_add, |a, b| a + b)
}

fn subtract(args: &Args) -> Result<Value, InvocationError> {
    arithmetic(args, i128::checked_sub, |a, b| a - b)
}

fn multiply(args: &Args) -> Result<Value, InvocationError> {
    arithmetic(args, i128::checked_mul, |a, b| a * b)
}

fn divide(args: &Args) -> Result<Value, InvocationError> {
    let x = args.number(0)?;
    let y = args.number(1)?;
    if y.is_zero() {
        return Err(InvocationError::DivisionByZero);
    }
    Number::Float(x.as_f64() / y.as_f64()).into_value()
}

// Powers of two are exact in f64: -2^63 is the smallest integer result and
// 2^64 the first one past the largest.
const INT_LOWER_BOUND: f64 = -9_223_372_036_854_775_808.0;
const INT_UPPER_BOUND: f64 = 18_446_744_073_709_551_616.0;

#[allow(clippy::cast_possible_truncation)] // Range checked against the integer bounds
fn floor(args: &Args) -> Result<Value, InvocationError> {
    match args.number(0)? {
        Number::Int(i) => Number::Int(i).into_value(),
        Number::Float(f) => {
            let floored = f.floor();
            if !floored.is_finite() {
                return Err(InvocationError::Domain);
            }
            if floored < INT_LOWER_BOUND || floored >= INT_UPPER_BOUND {
                return Err(InvocationError::Overflow);
            }
            Number::Int(floored as i128).into_value()
        }
    }
}

fn nroot(args: &Args) -> Result<Value, InvocationError> {
    let n = args.number(0)?;
    let x = args.number(1)?;
    if n.as_f64() <= 0.0 {
        return Err(InvocationError::NonPositiveRoot);
    }
    Number::Float(x.as_f64().powf(1.0 / n.as_f64())).into_value()
}

fn reverse(args: &Args) -> Result<Value, InvocationError> {
    let s = args.string(0)?;
    Ok(Value::String(s.chars().rev().collect()))
}

fn non_alphanumeric() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("[^a-z0-9]").expect("static pattern is valid"))
}

/// Lowercases and counts the `[a-z0-9]` characters of `s`.
fn letter_counts(s: &str) -> HashMap<char, usize> {
    let lowered = s.to_lowercase();
    let cleaned = non_alphanumeric().replace_all(&lowered, "");
    let mut counts = HashMap::new();
    for c in cleaned.chars() {
        *counts.entry(c).or_insert(0) += 1;
    }
    counts
}

fn valid_anagram(args: &Args) -> Result<Value, InvocationError> {
    let first = args.string(0)?;
    let second = args.string(1)?;
    Ok(Value::Bool(letter_counts(first) == letter_counts(second)))
}

fn sort(args: &Args) -> Result<Value, InvocationError> {
    let mut items = args.strings(0)?;
    if items.len() < 2 {
        return Err(InvocationError::SortTooShort);
    }
    items.sort_by_cached_key(|s| s.to_lowercase());
    Ok(json!(items))
}

fn help(_args: &Args) -> Result<Value, InvocationError> {
    Ok(json!({
        "commands": [
            {"name": "add", "description": "足し算", "example": "add 1 2 --> 3"},
            {"name": "subtract", "description": "引き算", "example": "subtract 9 2 --> 7"},
            {"name": "multiply", "description": "掛け算", "example": "multiply 5 4 --> 20"},
            {"name": "divide", "description": "割り算", "example": "divide 10 2 --> 5"},
            {"name": "floor", "description": "切捨て", "example": "floor 1.35 --> 1"},
            {"name": "nroot", "description": "ｎ乗根", "example": "nroot 3 64 --> 4"},
            {"name": "reverse", "description": "文字を反転", "example": "reverse HelloWorld! --> !dlroWolleH"},
            {"name": "validAnagram", "description": "アナグラムか確認", "example": "validAnagram HelloWorld! olleH!dlroW --> true"},
            {"name": "sort", "description": "リストをソート", "example": "sort spade diamond clover heart --> ['clover', 'diamond', 'heart', 'spade']"},
            {"name": "help", "description": "このヘルプを表示"},
        ]
    }))
}

/// Immutable name → method mapping.
#[derive(Debug, Clone)]
pub struct MethodTable {
    entries: Vec<MethodEntry>,
}

impl MethodTable {
    /// Creates a table from the given entries.
    #[must_use]
    pub const fn new(entries: Vec<MethodEntry>) -> Self {
        Self { entries }
    }

    /// The ten methods this server exposes.
    #[must_use]
    pub fn standard() -> Self {
        const fn spread(
            name: &'static str,
            params: &'static [&'static str],
            handler: Handler,
        ) -> MethodEntry {
            MethodEntry {
                name,
                params,
                binding: Binding::Spread,
                handler,
            }
        }

        Self::new(vec![
            spread("add", &["x", "y"], add),
            spread("subtract", &["x", "y"], subtract),
            spread("multiply", &["x", "y"], multiply),
            spread("divide", &["x", "y"], divide),
            spread("floor", &["x"], floor),
            spread("nroot", &["n", "x"], nroot),
            spread("reverse", &["s"], reverse),
            spread("validAnagram", &["str1", "str2"], valid_anagram),
            MethodEntry {
                name: "sort",
                params: &["array"],
                binding: Binding::Collect,
                handler: sort,
            },
            spread("help", &[], help),
        ])
    }

    /// Looks up a method by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&MethodEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Iterates over the registered method names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.name)
    }
}

impl Default for MethodTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, params: Value) -> Result<Value, InvocationError> {
        MethodTable::standard()
            .lookup(name)
            .unwrap_or_else(|| panic!("no method {name}"))
            .invoke(params)
    }

    #[test]
    fn standard_table_names() {
        let table = MethodTable::standard();
        let names: Vec<_> = table.names().collect();
        assert_eq!(
            names,
            [
                "add",
                "subtract",
                "multiply",
                "divide",
                "floor",
                "nroot",
                "reverse",
                "validAnagram",
                "sort",
                "help"
            ]
        );
        assert!(table.lookup("exit").is_none());
    }

    #[test]
    fn integer_arithmetic_stays_integral() {
        assert_eq!(call("add", json!([1, 2])).unwrap(), json!(3));
        assert_eq!(call("subtract", json!([9, 2])).unwrap(), json!(7));
        assert_eq!(call("multiply", json!([5, 4])).unwrap(), json!(20));
    }

    #[test]
    fn mixed_arithmetic_is_float() {
        let result = call("add", json!([1, 0.5])).unwrap();
        assert!(result.is_f64());
        assert_eq!(result, json!(1.5));
    }

    #[test]
    fn integer_overflow_is_an_error() {
        let err = call("multiply", json!([u64::MAX, 2])).unwrap_err();
        assert_eq!(err, InvocationError::Overflow);

        let err = call("subtract", json!([i64::MIN, 1])).unwrap_err();
        assert_eq!(err, InvocationError::Overflow);
    }

    #[test]
    fn large_unsigned_integers_stay_integral() {
        let sum = call("add", json!([u64::MAX, 0])).unwrap();
        assert!(sum.is_u64());
        assert_eq!(sum, json!(u64::MAX));

        let product = call("multiply", json!([i64::MAX, 2])).unwrap();
        assert_eq!(product, json!(18_446_744_073_709_551_614_u64));

        let back = call("subtract", json!([u64::MAX, u64::MAX])).unwrap();
        assert_eq!(back, json!(0));

        let floored = call("floor", json!([9_223_372_036_854_775_808_u64])).unwrap();
        assert_eq!(floored, json!(9_223_372_036_854_775_808_u64));
    }

    #[test]
    fn divide_is_true_division() {
        let result = call("divide", json!([10, 2])).unwrap();
        assert!(result.is_f64());
        assert_eq!(result, json!(5.0));
        assert_eq!(call("divide", json!([1, 4])).unwrap(), json!(0.25));
    }

    #[test]
    fn divide_by_zero() {
        assert_eq!(
            call("divide", json!([1, 0])).unwrap_err(),
            InvocationError::DivisionByZero
        );
        assert_eq!(
            call("divide", json!([1.5, 0.0])).unwrap_err(),
            InvocationError::DivisionByZero
        );
    }

    #[test]
    fn floor_returns_integer() {
        assert_eq!(call("floor", json!([1.35])).unwrap(), json!(1));
        assert_eq!(call("floor", json!([-1.5])).unwrap(), json!(-2));
        assert_eq!(call("floor", json!([7])).unwrap(), json!(7));
    }

    #[test]
    fn floor_out_of_range() {
        assert_eq!(
            call("floor", json!([1e300])).unwrap_err(),
            InvocationError::Overflow
        );
    }

    #[test]
    fn nroot_computes_root() {
        let result = call("nroot", json!([2, 16])).unwrap();
        assert_eq!(result, json!(4.0));

        let cube = call("nroot", json!([3, 64])).unwrap().as_f64().unwrap();
        assert!((cube - 4.0).abs() < 1e-9);
    }

    #[test]
    fn nroot_rejects_non_positive_index() {
        assert_eq!(
            call("nroot", json!([0, 8])).unwrap_err(),
            InvocationError::NonPositiveRoot
        );
        assert_eq!(
            call("nroot", json!([-2, 8])).unwrap_err(),
            InvocationError::NonPositiveRoot
        );
    }

    #[test]
    fn nroot_of_negative_is_domain_error() {
        assert_eq!(
            call("nroot", json!([2, -4])).unwrap_err(),
            InvocationError::Domain
        );
    }

    #[test]
    fn reverse_string() {
        assert_eq!(
            call("reverse", json!(["HelloWorld!"])).unwrap(),
            json!("!dlroWolleH")
        );
        assert_eq!(call("reverse", json!(["こんにちは"])).unwrap(), json!("はちにんこ"));
    }

    #[test]
    fn valid_anagram_ignores_case_and_punctuation() {
        assert_eq!(
            call("validAnagram", json!(["HelloWorld!", "olleH!dlroW"])).unwrap(),
            json!(true)
        );
        assert_eq!(
            call("validAnagram", json!(["Dormitory", "dirty room!!"])).unwrap(),
            json!(true)
        );
        assert_eq!(
            call("validAnagram", json!(["abc", "abd"])).unwrap(),
            json!(false)
        );
        assert_eq!(
            call("validAnagram", json!(["aab", "abb"])).unwrap(),
            json!(false)
        );
    }

    #[test]
    fn sort_receives_whole_array() {
        let result = call("sort", json!(["spade", "diamond", "clover", "heart"])).unwrap();
        assert_eq!(result, json!(["clover", "diamond", "heart", "spade"]));
    }

    #[test]
    fn sort_is_case_insensitive() {
        let result = call("sort", json!(["banana", "Apple", "cherry"])).unwrap();
        assert_eq!(result, json!(["Apple", "banana", "cherry"]));
    }

    #[test]
    fn sort_requires_two_strings() {
        assert_eq!(
            call("sort", json!(["only"])).unwrap_err(),
            InvocationError::SortTooShort
        );
        assert_eq!(
            call("sort", json!([])).unwrap_err(),
            InvocationError::SortTooShort
        );
    }

    #[test]
    fn sort_rejects_non_strings() {
        let err = call("sort", json!(["a", 1])).unwrap_err();
        assert!(matches!(err, InvocationError::TypeMismatch { .. }));
    }

    #[test]
    fn sort_by_keyword() {
        let result = call("sort", json!({"array": ["b", "A"]})).unwrap();
        assert_eq!(result, json!(["A", "b"]));
    }

    #[test]
    fn help_lists_every_method() {
        let result = call("help", json!({})).unwrap();
        let commands = result["commands"].as_array().unwrap();
        let table = MethodTable::standard();
        for name in table.names() {
            assert!(commands.iter().any(|c| c["name"] == name), "{name} missing");
        }
    }

    #[test]
    fn help_descriptions() {
        let result = call("help", json!([])).unwrap();
        let commands = result["commands"].as_array().unwrap();
        assert_eq!(commands[0]["description"], "足し算");
        assert_eq!(commands[8]["description"], "リストをソート");
        assert!(commands[9].get("example").is_none());
    }

    #[test]
    fn keyword_binding() {
        assert_eq!(call("subtract", json!({"y": 2, "x": 9})).unwrap(), json!(7));
    }

    #[test]
    fn keyword_binding_missing_argument() {
        let err = call("add", json!({"x": 1})).unwrap_err();
        assert_eq!(err.to_string(), "add() missing required argument: 'y'");
    }

    #[test]
    fn keyword_binding_unexpected_argument() {
        let err = call("floor", json!({"x": 1.5, "z": 0})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "floor() got an unexpected keyword argument 'z'"
        );
    }

    #[test]
    fn positional_binding_wrong_count() {
        let err = call("add", json!([1, 2, 3])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "add() takes 2 positional arguments but 3 were given"
        );

        let err = call("reverse", json!([])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "reverse() takes 1 positional argument but 0 were given"
        );
    }

    #[test]
    fn scalar_params_rejected() {
        let err = call("add", json!("1 2")).unwrap_err();
        assert!(matches!(err, InvocationError::InvalidParams { .. }));
    }

    #[test]
    fn type_mismatch_names_parameter() {
        let err = call("add", json!(["a", 1])).unwrap_err();
        assert_eq!(err.to_string(), "argument 'x' must be a number");
    }

    #[test]
    fn custom_table_lookup() {
        fn answer(_args: &Args) -> Result<Value, InvocationError> {
            Ok(json!(42))
        }

        let table = MethodTable::new(vec![MethodEntry {
            name: "answer",
            params: &[],
            binding: Binding::Spread,
            handler: answer,
        }]);
        assert_eq!(
            table.lookup("answer").unwrap().invoke(json!([])).unwrap(),
            json!(42)
        );
        assert!(table.lookup("add").is_none());
    }
}
