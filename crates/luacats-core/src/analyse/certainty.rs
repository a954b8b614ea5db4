// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Graded certainty for inferred types.
//!
//! Every inferred type carries a [`Certainty`] grade. Grades combine with
//! the join operator [`Certainty::join`] when an expression derives from
//! several operands: one shaky operand makes the whole result shaky, and
//! an operand nobody knows anything about caps the result at
//! [`Certainty::Uncertain`].
//!
//! A slot (parameter, return position, binding) accumulates independently
//! inferred possibilities as [`Variant`]s; each variant keeps its own
//! qualifier so the merger can tell a confidently observed union member
//! from a speculative one.

use std::fmt;

use super::types::TypeExpr;

/// Confidence grade for an inferred type, ordered
/// `Unknown < Uncertain < Certain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Certainty {
    /// Nothing usable was inferred.
    Unknown,
    /// Plausible but unverified (seeded annotations, ambiguous operators,
    /// cross-file propagation through shaky facts).
    Uncertain,
    /// Derived from literals or a pre-seeded catalogue entry.
    Certain,
}

impl Certainty {
    /// Joins two certainties (the ⊕ of the inference rules).
    ///
    /// Symmetric and associative:
    /// - `Certain ⊕ Certain = Certain`
    /// - `Unknown ⊕ Unknown = Unknown`
    /// - `Unknown ⊕ {Uncertain, Certain} = Uncertain`
    /// - `Uncertain ⊕ {Uncertain, Certain} = Uncertain`
    #[must_use]
    pub fn join(self, other: Self) -> Self {
        match (self, other) {
            (Self::Certain, Self::Certain) => Self::Certain,
            (Self::Unknown, Self::Unknown) => Self::Unknown,
            _ => Self::Uncertain,
        }
    }
}

impl fmt::Display for Certainty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Uncertain => write!(f, "uncertain"),
            Self::Certain => write!(f, "certain"),
        }
    }
}

/// Qualifier for one variant of a slot's type, mirroring the certainty
/// ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariantQualifier {
    /// Contributed by an Unknown-grade fact.
    VariantUnknown,
    /// Contributed by an Uncertain-grade fact.
    VariantLikely,
    /// Contributed by a Certain-grade fact.
    VariantCertain,
}

impl From<Certainty> for VariantQualifier {
    fn from(certainty: Certainty) -> Self {
        match certainty {
            Certainty::Unknown => Self::VariantUnknown,
            Certainty::Uncertain => Self::VariantLikely,
            Certainty::Certain => Self::VariantCertain,
        }
    }
}

impl From<VariantQualifier> for Certainty {
    fn from(qualifier: VariantQualifier) -> Self {
        match qualifier {
            VariantQualifier::VariantUnknown => Self::Unknown,
            VariantQualifier::VariantLikely => Self::Uncertain,
            VariantQualifier::VariantCertain => Self::Certain,
        }
    }
}

/// An inferred type with its certainty grade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeFact {
    /// The inferred type.
    pub type_expr: TypeExpr,
    /// How confident the engine is in it.
    pub certainty: Certainty,
}

impl TypeFact {
    /// Creates a fact.
    #[must_use]
    pub fn new(type_expr: TypeExpr, certainty: Certainty) -> Self {
        Self {
            type_expr,
            certainty,
        }
    }

    /// A fact carrying no information.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(TypeExpr::Unknown, Certainty::Unknown)
    }

    /// A fact known for certain.
    #[must_use]
    pub fn certain(type_expr: TypeExpr) -> Self {
        Self::new(type_expr, Certainty::Certain)
    }

    /// A plausible but unverified fact.
    #[must_use]
    pub fn uncertain(type_expr: TypeExpr) -> Self {
        Self::new(type_expr, Certainty::Uncertain)
    }
}

/// One candidate type among several possible for a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// The candidate type.
    pub type_expr: TypeExpr,
    /// The qualifier of this candidate.
    pub qualifier: VariantQualifier,
    /// `true` when this variant was seeded from an existing annotation
    /// rather than observed in code. Seeded variants propagate to call
    /// sites but are excluded when checking the annotation they came
    /// from — an annotation must not corroborate itself.
    pub seeded: bool,
}

/// Accumulated variants for one slot (a parameter, a return position, or
/// the declaration's own binding).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotFacts {
    variants: Vec<Variant>,
}

impl SlotFacts {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot holding a single fact.
    #[must_use]
    pub fn from_fact(fact: TypeFact) -> Self {
        let mut slot = Self::new();
        slot.add(fact);
        slot
    }

    /// Records an independently observed fact as a variant.
    ///
    /// A vacuous fact (unknown type) is only kept while the slot has no
    /// real variant, and duplicate types keep their strongest qualifier.
    pub fn add(&mut self, fact: TypeFact) {
        self.insert(fact, false);
    }

    /// Records a fact seeded from an existing annotation. Seeded
    /// variants propagate like observed ones but are excluded from
    /// [`SlotFacts::collapse_observed`].
    pub fn add_seed(&mut self, fact: TypeFact) {
        self.insert(fact, true);
    }

    fn insert(&mut self, fact: TypeFact, seeded: bool) {
        let qualifier = VariantQualifier::from(fact.certainty);
        if fact.type_expr.is_unknown() {
            if self.variants.is_empty() {
                self.variants.push(Variant {
                    type_expr: fact.type_expr,
                    qualifier,
                    seeded,
                });
            }
            return;
        }
        self.variants.retain(|v| !v.type_expr.is_unknown());
        if let Some(existing) = self
            .variants
            .iter_mut()
            .find(|v| v.type_expr == fact.type_expr)
        {
            existing.qualifier = existing.qualifier.max(qualifier);
            existing.seeded = existing.seeded && seeded;
            return;
        }
        self.variants.push(Variant {
            type_expr: fact.type_expr,
            qualifier,
            seeded,
        });
    }

    /// Returns the accumulated variants.
    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Returns `true` if the slot has no variants at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Collapses the variants into a single fact: the union of all
    /// variant types, graded by the strongest qualifier present.
    #[must_use]
    pub fn collapse(&self) -> TypeFact {
        Self::collapse_iter(self.variants.iter())
    }

    /// Collapses only the observed variants, leaving annotation seeds
    /// out. This is the view the merger compares existing annotations
    /// against.
    #[must_use]
    pub fn collapse_observed(&self) -> TypeFact {
        Self::collapse_iter(self.variants.iter().filter(|v| !v.seeded))
    }

    fn collapse_iter<'a>(variants: impl Iterator<Item = &'a Variant>) -> TypeFact {
        let mut ty = TypeExpr::Unknown;
        let mut certainty = Certainty::Unknown;
        for variant in variants {
            ty = ty.union_with(&variant.type_expr);
            certainty = certainty.max(Certainty::from(variant.qualifier));
        }
        TypeFact::new(ty, certainty)
    }

    /// Returns the distinct observed types among the strongest observed
    /// variants, used to surface equal-strength disagreements.
    #[must_use]
    pub fn strongest_disagreement(&self) -> Option<Vec<&Variant>> {
        let observed = || self.variants.iter().filter(|v| !v.seeded);
        let strongest = observed().map(|v| v.qualifier).max()?;
        let top: Vec<_> = observed()
            .filter(|v| v.qualifier == strongest)
            .collect();
        (top.len() > 1).then_some(top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_table() {
        use Certainty::{Certain, Uncertain, Unknown};
        assert_eq!(Certain.join(Certain), Certain);
        assert_eq!(Unknown.join(Unknown), Unknown);
        assert_eq!(Unknown.join(Certain), Uncertain);
        assert_eq!(Unknown.join(Uncertain), Uncertain);
        assert_eq!(Uncertain.join(Certain), Uncertain);
        assert_eq!(Uncertain.join(Uncertain), Uncertain);
        // Symmetry
        assert_eq!(Certain.join(Unknown), Unknown.join(Certain));
        // Associativity spot check
        assert_eq!(
            Unknown.join(Certain).join(Certain),
            Unknown.join(Certain.join(Certain))
        );
    }

    #[test]
    fn ordering() {
        assert!(Certainty::Unknown < Certainty::Uncertain);
        assert!(Certainty::Uncertain < Certainty::Certain);
        assert!(VariantQualifier::VariantUnknown < VariantQualifier::VariantLikely);
        assert!(VariantQualifier::VariantLikely < VariantQualifier::VariantCertain);
    }

    #[test]
    fn slot_accumulates_union() {
        let mut slot = SlotFacts::new();
        slot.add(TypeFact::certain(TypeExpr::named("string")));
        slot.add(TypeFact::uncertain(TypeExpr::named("number")));
        let fact = slot.collapse();
        assert_eq!(fact.type_expr.to_string(), "string|number");
        assert_eq!(fact.certainty, Certainty::Certain);
    }

    #[test]
    fn slot_drops_vacuous_variant_when_real_one_arrives() {
        let mut slot = SlotFacts::new();
        slot.add(TypeFact::unknown());
        assert_eq!(slot.collapse().certainty, Certainty::Unknown);

        slot.add(TypeFact::certain(TypeExpr::named("boolean")));
        assert_eq!(slot.variants().len(), 1);
        assert_eq!(slot.collapse().type_expr, TypeExpr::named("boolean"));
    }

    #[test]
    fn duplicate_type_keeps_strongest_qualifier() {
        let mut slot = SlotFacts::new();
        slot.add(TypeFact::uncertain(TypeExpr::named("string")));
        slot.add(TypeFact::certain(TypeExpr::named("string")));
        assert_eq!(slot.variants().len(), 1);
        assert_eq!(
            slot.variants()[0].qualifier,
            VariantQualifier::VariantCertain
        );
    }

    #[test]
    fn seeded_variants_are_excluded_from_observed_collapse() {
        let mut slot = SlotFacts::new();
        slot.add_seed(TypeFact::uncertain(TypeExpr::named("number")));
        assert_eq!(slot.collapse().type_expr, TypeExpr::named("number"));
        assert!(slot.collapse_observed().type_expr.is_unknown());

        // An observation of the same type takes the variant over.
        slot.add(TypeFact::certain(TypeExpr::named("number")));
        assert_eq!(
            slot.collapse_observed().type_expr,
            TypeExpr::named("number")
        );
        assert_eq!(slot.collapse_observed().certainty, Certainty::Certain);
    }

    #[test]
    fn strongest_disagreement_detected() {
        let mut slot = SlotFacts::new();
        slot.add(TypeFact::uncertain(TypeExpr::named("string")));
        slot.add(TypeFact::uncertain(TypeExpr::named("number")));
        let top = slot.strongest_disagreement().expect("disagreement");
        assert_eq!(top.len(), 2);

        let mut slot = SlotFacts::new();
        slot.add(TypeFact::certain(TypeExpr::named("string")));
        slot.add(TypeFact::uncertain(TypeExpr::named("number")));
        assert!(slot.strongest_disagreement().is_none());
    }
}
