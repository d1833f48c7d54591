use collatz_forest::rules::{Expr, ExprError};
use collatz_forest::RuleSet;
use test_case::test_case;

#[test_case("n/2", 10 => Some(5) ; "halving")]
#[test_case("3*n+1", 7 => Some(22) ; "classic odd step")]
#[test_case("(n/2) + 1", 9 => Some(5) ; "floor applied to the final result")]
#[test_case("(4*n+2)/3", 7 => Some(10) ; "grouped division")]
#[test_case("n mod 3", 10 => Some(1) ; "mod keyword")]
#[test_case("n % 3", -10 => Some(-1) ; "remainder keeps sign of dividend")]
#[test_case("1.5*n", 3 => Some(4) ; "decimal literal")]
#[test_case("-n", 4 => Some(-4) ; "unary minus")]
#[test_case("2**n", 10 => Some(1024) ; "power")]
#[test_case("n**-1", 2 => Some(0) ; "negative exponent")]
#[test_case("7", 100 => Some(7) ; "constant")]
#[test_case("n/0", 1 => None ; "division by zero")]
#[test_case("n/(n-3)", 3 => None ; "division by zero at one input")]
fn evaluates(source: &str, n: i64) -> Option<i64> {
    Expr::parse(source).expect("expression parses").eval_floor(n)
}

#[test_case("n +" ; "dangling operator")]
#[test_case("((n)" ; "unclosed paren")]
#[test_case("2n" ; "implicit multiplication")]
#[test_case("sqrt(n)" ; "function call")]
#[test_case("n & 1" ; "bitwise operator")]
#[test_case("" ; "empty")]
fn rejects(source: &str) {
    let err: ExprError = Expr::parse(source).unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn rule_set_falls_back_on_missing_and_invalid_rules() {
    // residue 1 is unparseable (identity), residue 2 is missing (constant 1)
    let rules = RuleSet::new(3, &["n/3", "bogus"]).unwrap();
    assert_eq!(rules.apply(6), Some(2));
    assert_eq!(rules.apply(4), Some(4));
    assert_eq!(rules.apply(5), Some(1));
}
