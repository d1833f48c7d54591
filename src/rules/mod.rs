//! Rule evaluation
//!
//! A rule set maps each residue class `r = n mod M` to an arithmetic
//! expression over `n`. Evaluation never fails loudly:
//! - missing or blank expression → constant `1`
//! - unparseable expression → identity `n` (logged once at compile time)
//! - undefined result (÷0, overflow) → `None`, left to the caller

mod config;
mod expr;

pub use config::{RuleConfig, RulePreset};
pub use expr::{BinOp, Expr, ExprError, Rational, MAX_NESTING, MAX_TOKENS};

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::Value;

/// Errors raised while assembling a rule set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// Modulus must be at least 1.
    #[error("modulus must be > 0")]
    ZeroModulus,

    /// Named preset is not known.
    #[error("unknown rule preset '{0}'")]
    UnknownPreset(String),
}

/// One compiled residue-class rule.
#[derive(Debug, Clone)]
pub enum CompiledRule {
    /// Parsed expression.
    Expr(Arc<Expr>),
    /// Missing expression: always yields this constant.
    Constant(Value),
    /// Expression failed to parse: yields `n` unchanged.
    Identity,
}

impl CompiledRule {
    /// Apply to `n`; `None` when the result is undefined.
    #[inline]
    pub fn apply(&self, n: Value) -> Option<Value> {
        match self {
            CompiledRule::Expr(expr) => expr.eval_floor(n),
            CompiledRule::Constant(value) => Some(*value),
            CompiledRule::Identity => Some(n),
        }
    }
}

/// Cache of parsed expressions keyed by source string.
///
/// Identical rule strings compile once and share one `Arc<Expr>`.
#[derive(Debug, Default)]
pub struct ExprCache {
    entries: HashMap<String, Result<Arc<Expr>, ExprError>>,
}

impl ExprCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Parse `source`, reusing a previous parse of the same string.
    pub fn get_or_parse(&mut self, source: &str) -> Result<Arc<Expr>, ExprError> {
        let key = source.trim();
        if let Some(cached) = self.entries.get(key) {
            return cached.clone();
        }
        let parsed = Expr::parse(key).map(Arc::new);
        self.entries.insert(key.to_string(), parsed.clone());
        parsed
    }

    /// Number of distinct strings seen.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been parsed yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Value returned for residue classes without an expression.
pub const MISSING_RULE_FALLBACK: Value = 1;

/// Compiled per-residue step function.
#[derive(Debug, Clone)]
pub struct RuleSet {
    modulus: Value,
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile `sources[r]` for each residue class `r` in `0..modulus`.
    pub fn new<S: AsRef<str>>(modulus: u32, sources: &[S]) -> Result<Self, RuleError> {
        Self::with_cache(modulus, sources, &mut ExprCache::new())
    }

    /// Compile against a shared expression cache.
    pub fn with_cache<S: AsRef<str>>(
        modulus: u32,
        sources: &[S],
        cache: &mut ExprCache,
    ) -> Result<Self, RuleError> {
        if modulus == 0 {
            return Err(RuleError::ZeroModulus);
        }

        let rules = (0..modulus as usize)
            .map(|residue| {
                let source = sources.get(residue).map(|s| s.as_ref()).unwrap_or("");
                if source.trim().is_empty() {
                    return CompiledRule::Constant(MISSING_RULE_FALLBACK);
                }
                match cache.get_or_parse(source) {
                    Ok(expr) => CompiledRule::Expr(expr),
                    Err(err) => {
                        tracing::warn!(
                            residue,
                            rule = source,
                            error = %err,
                            "invalid rule syntax, falling back to identity"
                        );
                        CompiledRule::Identity
                    }
                }
            })
            .collect();

        Ok(Self {
            modulus: modulus as Value,
            rules,
        })
    }

    /// Compile a rule configuration.
    pub fn from_config(config: &RuleConfig) -> Result<Self, RuleError> {
        Self::new(config.modulus, &config.rules)
    }

    /// Modulus `M`.
    pub fn modulus(&self) -> Value {
        self.modulus
    }

    /// Residue class used to select a rule (always in `0..M`).
    #[inline]
    pub fn residue(&self, n: Value) -> usize {
        n.rem_euclid(self.modulus) as usize
    }

    /// Compiled rule for residue class `r`.
    pub fn rule(&self, residue: usize) -> Option<&CompiledRule> {
        self.rules.get(residue)
    }

    /// Next value in the sequence, or `None` when the rule is undefined at `n`.
    #[inline]
    pub fn apply(&self, n: Value) -> Option<Value> {
        match self.rules.get(self.residue(n)) {
            Some(rule) => rule.apply(n),
            None => Some(MISSING_RULE_FALLBACK),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_step() {
        let rules = RuleSet::new(2, &["n/2", "3*n+1"]).unwrap();
        assert_eq!(rules.apply(6), Some(3));
        assert_eq!(rules.apply(3), Some(10));
        assert_eq!(rules.apply(1), Some(4));
    }

    #[test]
    fn test_fail_safe_fallbacks() {
        let rules = RuleSet::new(3, &["n/3", "this is not arithmetic"]).unwrap();
        assert!(matches!(rules.rule(1), Some(CompiledRule::Identity)));
        assert!(matches!(rules.rule(2), Some(CompiledRule::Constant(1))));
        assert_eq!(rules.apply(7), Some(7));
        assert_eq!(rules.apply(8), Some(1));
    }

    #[test]
    fn test_overly_nested_rule_falls_back_to_identity() {
        let nested = format!("{}n{}", "(".repeat(200_000), ")".repeat(200_000));
        let rules = RuleSet::new(2, &["n/2".to_string(), nested]).unwrap();
        assert!(matches!(rules.rule(1), Some(CompiledRule::Identity)));
        assert_eq!(rules.apply(5), Some(5));
    }

    #[test]
    fn test_negative_inputs_use_euclidean_residue() {
        let rules = RuleSet::new(2, &["n/2", "3*n+1"]).unwrap();
        assert_eq!(rules.residue(-3), 1);
        assert_eq!(rules.apply(-3), Some(-8));
    }

    #[test]
    fn test_zero_modulus_rejected() {
        let empty: [&str; 0] = [];
        assert_eq!(RuleSet::new(0, &empty).unwrap_err(), RuleError::ZeroModulus);
    }

    #[test]
    fn test_cache_shares_identical_sources() {
        let mut cache = ExprCache::new();
        let rules = RuleSet::with_cache(4, &["3*n+1", "3*n+1", "n/2", " n/2 "], &mut cache).unwrap();
        assert_eq!(cache.len(), 2);
        match (rules.rule(0), rules.rule(1)) {
            (Some(CompiledRule::Expr(a)), Some(CompiledRule::Expr(b))) => {
                assert!(Arc::ptr_eq(a, b))
            }
            other => panic!("expected two compiled expressions, got {:?}", other),
        }
    }
}
