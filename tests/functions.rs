/// Function library coverage through full expressions.
mod common;

use common::{eval_json, eval_no_input, eval_ok};
use serde_json::json;

fn j(expr: &str) -> serde_json::Value {
    eval_json(expr, json!(null))
}

#[test]
fn string_renders_json_style() {
    assert_eq!(j("$string(135)"), json!("135"));
    assert_eq!(j("$string(0.5)"), json!("0.5"));
    assert_eq!(j("$string(\"abc\")"), json!("abc"));
    assert_eq!(j("$string(true)"), json!("true"));
    assert_eq!(j("$string(null)"), json!("null"));
    assert_eq!(
        j("$string({\"a\": [1, \"x\"]})"),
        json!("{\"a\":[1,\"x\"]}")
    );
    // Callables have no JSON form.
    assert_eq!(j("$string($sum)"), json!(""));
}

#[test]
fn string_lengths_are_code_points() {
    assert_eq!(j("$length(\"Hello World\")"), json!(11));
    assert_eq!(j("$length(\"嗨你好\")"), json!(3));
}

#[test]
fn substring_family() {
    assert_eq!(j("$substring(\"Hello World\", 3)"), json!("lo World"));
    assert_eq!(j("$substring(\"Hello World\", 3, 5)"), json!("lo Wo"));
    assert_eq!(j("$substring(\"Hello World\", -4)"), json!("orld"));
    assert_eq!(j("$substringBefore(\"a@b.c\", \"@\")"), json!("a"));
    assert_eq!(j("$substringAfter(\"a@b.c\", \"@\")"), json!("b.c"));
}

#[test]
fn case_trim_and_pad() {
    assert_eq!(j("$uppercase(\"oK\")"), json!("OK"));
    assert_eq!(j("$lowercase(\"oK\")"), json!("ok"));
    assert_eq!(j("$trim(\"  a  b \")"), json!("a b"));
    assert_eq!(j("$pad(\"5\", -3, \"0\")"), json!("005"));
    assert_eq!(j("$pad(\"ab\", 4)"), json!("ab  "));
}

#[test]
fn contains_split_join() {
    assert_eq!(j("$contains(\"abracadabra\", \"bra\")"), json!(true));
    assert_eq!(j("$contains(\"abracadabra\", /a.*a/)"), json!(true));
    assert_eq!(j("$contains(\"abc\", /z/)"), json!(false));
    assert_eq!(
        j("$split(\"a, b, c\", \", \")"),
        json!(["a", "b", "c"])
    );
    assert_eq!(j("$split(\"a1b2c\", /\\d/)"), json!(["a", "b", "c"]));
    assert_eq!(j("$join([\"a\", \"b\"], \"-\")"), json!("a-b"));
    assert_eq!(j("$join(\"solo\")"), json!("solo"));
}

#[test]
fn replace_with_patterns_and_functions() {
    assert_eq!(
        j("$replace(\"John Smith\", \"John\", \"Jane\")"),
        json!("Jane Smith")
    );
    assert_eq!(
        j("$replace(\"265USD\", /([0-9]+)USD/, \"$$$1\")"),
        json!("$265")
    );
    assert_eq!(
        j("$replace(\"abcd\", /(ab)|(a)/, \"[$1$2]\")"),
        json!("[ab]cd")
    );
    assert_eq!(
        j("$replace(\"temperature 22C\", /(\\d+)C/, function($m){($m.groups[0] & \"C is warm\")})"),
        json!("temperature 22C is warm")
    );
}

#[test]
fn match_returns_records() {
    assert_eq!(
        j("$match(\"ababbabbcc\", /a(b+)/)"),
        json!([
            {"match": "ab", "index": 0, "groups": ["b"]},
            {"match": "abb", "index": 2, "groups": ["bb"]},
            {"match": "abb", "index": 5, "groups": ["bb"]}
        ])
    );
    assert_eq!(
        j("$match(\"ababbabbcc\", /a(b+)/, 1)"),
        json!([{"match": "ab", "index": 0, "groups": ["b"]}])
    );
}

#[test]
fn number_casts() {
    assert_eq!(j("$number(\"5e2\")"), json!(500));
    assert_eq!(j("$number(true)"), json!(1));
    assert_eq!(j("$number(false)"), json!(0));
    assert!(eval_no_input("$number(\"five\")").is_err());
    assert!(eval_no_input("$number([1])").is_err());
}

#[test]
fn rounding_family() {
    assert_eq!(j("$abs(-7)"), json!(7));
    assert_eq!(j("$floor(3.7)"), json!(3));
    assert_eq!(j("$ceil(3.2)"), json!(4));
    assert_eq!(j("$round(2.5)"), json!(2));
    assert_eq!(j("$round(3.5)"), json!(4));
    assert_eq!(j("$round(4.525, 2)"), json!(4.52));
    assert_eq!(j("$sqrt(16)"), json!(4));
    assert_eq!(j("$power(2, 8)"), json!(256));
}

#[test]
fn aggregates() {
    assert_eq!(j("$sum([1, 2, 3])"), json!(6));
    assert_eq!(j("$max([1, 9, 2])"), json!(9));
    assert_eq!(j("$min([1, 9, 2])"), json!(1));
    assert_eq!(j("$average([1, 2, 3, 4])"), json!(2.5));
    assert_eq!(j("$count([1, 2, 3])"), json!(3));
    assert_eq!(j("$count(5)"), json!(1));
    assert_eq!(eval_json("$count(nothing)", json!({})), json!(0));
}

#[test]
fn format_number_pictures() {
    assert_eq!(j("$formatNumber(12345.6, \"#,###.00\")"), json!("12,345.60"));
    assert_eq!(j("$formatNumber(0.14, \"0%\")"), json!("14%"));
    assert_eq!(j("$formatNumber(1234.5678, \"#0.00e0\")"), json!("1.23e3"));
    assert_eq!(
        eval_json(
            "$formatNumber(0.14, \"###pm\", {\"per-mille\": \"m\"})",
            json!(null)
        ),
        json!("140pm")
    );
}

#[test]
fn format_base_radices() {
    assert_eq!(j("$formatBase(100, 2)"), json!("1100100"));
    assert_eq!(j("$formatBase(254, 16)"), json!("fe"));
    assert_eq!(j("$formatBase(73)"), json!("73"));
}

#[test]
fn array_functions() {
    assert_eq!(j("$append([1, 2], [3, 4])"), json!([1, 2, 3, 4]));
    assert_eq!(j("$append(1, 2)"), json!([1, 2]));
    assert_eq!(j("$reverse([1, 2, 3])"), json!([3, 2, 1]));
    assert_eq!(j("$sort([3, 1, 2])"), json!([1, 2, 3]));
    assert_eq!(j("$sort([\"b\", \"a\"])"), json!(["a", "b"]));
    assert_eq!(
        j("$sort([3, 1, 2], function($a, $b){$a < $b})"),
        json!([3, 2, 1])
    );
    assert_eq!(j("$zip([1, 2], [\"a\", \"b\"], [true])"), json!([[1, "a", true]]));
    assert_eq!(j("$distinct([1, 2, 1, 3, 2])"), json!([1, 2, 3]));
    assert_eq!(j("$count($shuffle([1, 2, 3, 4]))"), json!(4));
}

#[test]
fn object_functions() {
    assert_eq!(
        eval_json("$keys($)", json!({"b": 1, "a": 2})),
        json!(["b", "a"])
    );
    assert_eq!(
        eval_json("$lookup($, \"a\")", json!({"a": 42})),
        json!(42)
    );
    assert_eq!(
        eval_json("$spread($)", json!({"a": 1, "b": 2})),
        json!([{"a": 1}, {"b": 2}])
    );
    assert_eq!(
        j("$merge([{\"a\": 1}, {\"b\": 2}, {\"a\": 3}])"),
        json!({"a": 3, "b": 2})
    );
    assert_eq!(
        eval_json("$each($, function($v, $k){$k & \"=\" & $v})", json!({"x": 1, "y": 2})),
        json!(["x=1", "y=2"])
    );
}

#[test]
fn single_selects_exactly_one() {
    assert_eq!(
        j("$single([1, 2, 3], function($v){$v > 2})"),
        json!(3)
    );
    assert!(eval_no_input("$single([1, 2, 3], function($v){$v > 1})").is_err());
    assert!(eval_no_input("$single([1, 2], function($v){$v > 5})").is_err());
}

#[test]
fn boolean_family() {
    assert_eq!(j("$boolean(\"x\")"), json!(true));
    assert_eq!(j("$boolean([0, 0])"), json!(false));
    assert_eq!(j("$not(0)"), json!(true));
    assert_eq!(eval_json("$exists(a)", json!({"a": null})), json!(true));
    assert_eq!(eval_json("$exists(b)", json!({"a": null})), json!(false));
    assert_eq!(j("$type([1])"), json!("array"));
    assert_eq!(j("$type($type)"), json!("function"));
}

#[test]
fn boolean_is_idempotent_through_expressions() {
    for src in ["\"\"", "\"x\"", "0", "5", "[]", "[0]", "null"] {
        let once = eval_json(&format!("$boolean({src})"), json!(null));
        let twice = eval_json(&format!("$boolean($boolean({src}))"), json!(null));
        assert_eq!(once, twice, "double coercion changed {src}");
    }
}

#[test]
fn time_functions() {
    assert_eq!(j("$fromMillis(1510067557121)"), json!("2017-11-07T15:12:37.121Z"));
    assert_eq!(j("$toMillis(\"2017-11-07T15:12:37.121Z\")"), json!(1510067557121i64));
    assert_eq!(
        j("$fromMillis(1510067557121, \"[FNn], [D1o] [MNn] [Y]\")"),
        json!("Tuesday, 7th November 2017")
    );
    assert_eq!(
        j("$toMillis(\"07-11-2017\", \"[D01]-[M01]-[Y0001]\")"),
        json!(1510012800000i64)
    );
    // now() is ISO-8601 to milliseconds and millis() is epoch-based.
    let now = eval_ok("$now()", json!(null));
    let text = now.as_str().expect("now is a string");
    assert!(text.ends_with('Z') && text.contains('T') && text.contains('.'));
    let millis = eval_ok("$millis()", json!(null)).as_number().unwrap();
    assert!(millis > 1.5e12);
}

#[test]
fn context_binding_in_path_steps() {
    assert_eq!(
        eval_json("names.$uppercase()", json!({"names": ["ab", "cd"]})),
        json!(["AB", "CD"])
    );
    assert_eq!(
        eval_json("word.$length()", json!({"word": "four"})),
        json!(4)
    );
}

#[test]
fn undefined_propagation_masks() {
    let input = json!({});
    for expr in [
        "$string(nothing)",
        "$length(nothing)",
        "$uppercase(nothing)",
        "$abs(nothing)",
        "$sum(nothing)",
        "$keys(nothing)",
        "$boolean(nothing)",
        "$reverse(nothing)",
        "$fromMillis(nothing)",
    ] {
        assert!(
            eval_ok(expr, input.clone()).is_undefined(),
            "{expr} should propagate Undefined"
        );
    }
}
