//! Astrological validator
//!
//! Walks a parsed formula and collects diagnostics instead of failing on
//! the first offense. Every rule has a stable code (see
//! [`crate::diagnostics::RuleCode`]); `Error`-severity findings reject the
//! formula, `Warning` and `Info` are advisory.
//!
//! The walk is a pure function of the AST and the dignity configuration:
//! the same input always yields the same findings in the same order.

use crate::ast::{CmpOp, DomainKind, Expr, Literal, PropKind};
use crate::diagnostics::{Diagnostic, RuleCode, Validation};
use astrea_chart::{Dignity, DignityConfig, Mode, Planet};

/// Orbs beyond this many degrees draw a warning.
const MAX_REASONABLE_ORB: f64 = 10.0;

/// Validate a formula against the active dignity configuration.
pub fn validate(expr: &Expr, config: &DignityConfig) -> Validation {
    let mut run = ValidationRun {
        config,
        issues: Vec::new(),
    };
    run.visit(expr, None, false);
    Validation::new(run.issues)
}

/// Static type of an expression, for type-rule checking only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    Bool,
    Number,
    Str,
    Sign,
    Planet,
    Dignity,
    Aspect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ty {
    Scalar(Scalar),
    List(Scalar),
    Unknown,
}

impl Ty {
    fn is_numeric(self) -> bool {
        matches!(self, Ty::Scalar(Scalar::Number) | Ty::Unknown)
    }

    fn name(self) -> &'static str {
        match self {
            Ty::Scalar(Scalar::Bool) => "Bool",
            Ty::Scalar(Scalar::Number) => "Number",
            Ty::Scalar(Scalar::Str) => "String",
            Ty::Scalar(Scalar::Sign) => "Sign",
            Ty::Scalar(Scalar::Planet) => "Planet",
            Ty::Scalar(Scalar::Dignity) => "Dignity",
            Ty::Scalar(Scalar::Aspect) => "Aspect",
            Ty::List(_) => "List",
            Ty::Unknown => "Unknown",
        }
    }
}

/// Short-lived validation walk
struct ValidationRun<'a> {
    config: &'a DignityConfig,
    issues: Vec<Diagnostic>,
}

impl<'a> ValidationRun<'a> {
    /// Pre-order walk. `scope` is the domain of the nearest enclosing
    /// aggregator; `in_and` suppresses re-analysis of nested AND chains.
    fn visit(&mut self, expr: &Expr, scope: Option<DomainKind>, in_and: bool) {
        match expr {
            Expr::And { left, right } => {
                if !in_and {
                    let mut leaves = Vec::new();
                    collect_and_leaves(expr, &mut leaves);
                    self.analyze_conjunction(&leaves);
                }
                self.visit(left, scope, true);
                self.visit(right, scope, true);
            }
            Expr::Or { left, right } => {
                self.visit(left, scope, false);
                self.visit(right, scope, false);
            }
            Expr::Not { expr } => self.visit(expr, scope, false),
            Expr::Comparison { left, op, right } => {
                self.check_comparison(left, *op, right, scope);
                self.visit(left, scope, false);
                self.visit(right, scope, false);
            }
            Expr::Property { target, prop } => {
                self.check_property(target, *prop, scope);
                self.visit(target, scope, false);
            }
            Expr::Bound(prop) => self.check_bound(*prop, scope),
            Expr::Aspect { p1, p2, kind: _, orb } => {
                self.check_aspect_operand(p1, scope);
                self.check_aspect_operand(p2, scope);
                self.check_aspect_self(p1, p2);
                if let Some(orb) = orb {
                    if *orb > MAX_REASONABLE_ORB {
                        self.issues.push(
                            Diagnostic::warning(RuleCode::OrbLarge, "orb-large")
                                .with_binding("orb", *orb)
                                .with_binding("max", MAX_REASONABLE_ORB),
                        );
                    }
                }
                self.visit(p1, scope, false);
                self.visit(p2, scope, false);
            }
            Expr::Aggregate { filter, body, domain, .. } => {
                if let Some(filter) = filter {
                    self.check_filter(filter, *domain);
                    self.visit(filter, Some(*domain), false);
                }
                self.visit(body, Some(*domain), false);
            }
            Expr::Count { domain, filter } => {
                if let Some(filter) = filter {
                    self.check_filter(filter, *domain);
                    self.visit(filter, Some(*domain), false);
                }
            }
            Expr::House(n) => self.check_house(*n),
            Expr::List(elements) => {
                for element in elements {
                    self.visit(element, scope, false);
                }
            }
            Expr::Literal(_) | Expr::Planet(_) | Expr::Sign(_) | Expr::Angle(_) => {}
        }
    }

    // ============================================
    // Rule checks
    // ============================================

    fn check_house(&mut self, n: u32) {
        if !(1..=12).contains(&n) {
            self.issues.push(
                Diagnostic::error(RuleCode::HouseRange, "house-out-of-range")
                    .with_binding("got", n)
                    .with_binding("min", 1u32)
                    .with_binding("max", 12u32),
            );
        }
    }

    fn check_bound(&mut self, prop: PropKind, scope: Option<DomainKind>) {
        match scope {
            None => {
                self.issues.push(
                    Diagnostic::error(RuleCode::Type, "scoped-property-outside-aggregator")
                        .with_binding("property", prop.name()),
                );
            }
            Some(domain) => {
                if bound_prop_ty(domain, prop).is_none() {
                    self.issues.push(
                        Diagnostic::error(RuleCode::Type, "property-not-on-domain")
                            .with_binding("property", prop.name())
                            .with_binding("domain", domain.keyword()),
                    );
                }
            }
        }
    }

    fn check_property(&mut self, target: &Expr, prop: PropKind, scope: Option<DomainKind>) {
        match target {
            Expr::Planet(planet) => {
                if prop == PropKind::Retrograde && planet.is_luminary() {
                    self.issues.push(
                        Diagnostic::error(RuleCode::RetroLuminary, "retrograde-luminary")
                            .with_binding("planet", planet.name())
                            .with_suggestion("Mercury.Retrograde == True")
                            .with_suggestion("Venus.Retrograde == True"),
                    );
                }
                if matches!(prop, PropKind::Dignity | PropKind::Ruler)
                    && planet.is_modern_ruler()
                    && self.config.mode() == Mode::Traditional
                {
                    self.issues.push(
                        Diagnostic::warning(RuleCode::ModeMismatch, "modern-ruler-in-traditional")
                            .with_binding("planet", planet.name()),
                    );
                }
                if planet_prop_ty(prop).is_none() {
                    self.push_bad_property(prop, "planet");
                }
            }
            Expr::Angle(angle) => {
                if prop == PropKind::Retrograde {
                    self.issues.push(
                        Diagnostic::warning(RuleCode::RetroAngle, "retrograde-angle")
                            .with_binding("angle", angle.name()),
                    );
                }
                if angle_prop_ty(prop).is_none() {
                    self.push_bad_property(prop, "angle");
                }
            }
            Expr::Sign(_) => {
                if sign_prop_ty(prop).is_none() {
                    self.push_bad_property(prop, "sign");
                }
            }
            // Chained access (`Sun.Sign.Ruler`) and bound elements: type
            // the target statically and fall back to its object kind.
            Expr::Property { .. } | Expr::Bound(_) => match self.infer(target, scope) {
                Ty::Scalar(Scalar::Sign) => {
                    if sign_prop_ty(prop).is_none() {
                        self.push_bad_property(prop, "sign");
                    }
                }
                Ty::Scalar(Scalar::Planet) => {
                    if planet_prop_ty(prop).is_none() {
                        self.push_bad_property(prop, "planet");
                    }
                }
                Ty::Unknown | Ty::List(_) => {}
                other => {
                    self.issues.push(
                        Diagnostic::error(RuleCode::Type, "property-on-non-object")
                            .with_binding("property", prop.name())
                            .with_binding("target", other.name()),
                    );
                }
            },
            other => {
                self.issues.push(
                    Diagnostic::error(RuleCode::Type, "property-on-non-object")
                        .with_binding("property", prop.name())
                        .with_binding("target", self.infer(other, scope).name()),
                );
            }
        }
    }

    fn check_filter(&mut self, filter: &Expr, domain: DomainKind) {
        let ty = self.infer(filter, Some(domain));
        if !matches!(ty, Ty::Scalar(Scalar::Bool) | Ty::Unknown) {
            self.issues.push(
                Diagnostic::error(RuleCode::Type, "filter-not-boolean")
                    .with_binding("found", ty.name()),
            );
        }
    }

    fn check_aspect_operand(&mut self, operand: &Expr, scope: Option<DomainKind>) {
        let ty = self.infer(operand, scope);
        if !matches!(
            ty,
            Ty::Scalar(Scalar::Planet) | Ty::List(Scalar::Planet) | Ty::Unknown
        ) {
            self.issues.push(
                Diagnostic::error(RuleCode::Type, "aspect-operand-not-planet")
                    .with_binding("found", ty.name()),
            );
        }
    }

    /// `Asp(X, X, _)` in any spelling, including list overlap.
    fn check_aspect_self(&mut self, p1: &Expr, p2: &Expr) {
        let left = referenced_planets(p1);
        let right = referenced_planets(p2);
        if let Some(shared) = left.iter().find(|p| right.contains(p)) {
            self.issues.push(
                Diagnostic::error(RuleCode::AspSelf, "aspect-to-self")
                    .with_binding("planet", shared.name()),
            );
        }
    }

    fn check_comparison(&mut self, left: &Expr, op: CmpOp, right: &Expr, scope: Option<DomainKind>) {
        self.check_degree_bounds(left, right);
        self.check_degree_bounds(right, left);
        self.check_ruler_comparison(left, right);

        let left_ty = self.infer(left, scope);
        let right_ty = self.infer(right, scope);

        if op.is_ordering() {
            if !left_ty.is_numeric() || !right_ty.is_numeric() {
                self.issues.push(
                    Diagnostic::error(RuleCode::Type, "ordering-requires-numbers")
                        .with_binding("left", left_ty.name())
                        .with_binding("right", right_ty.name()),
                );
            }
            return;
        }

        if op == CmpOp::In {
            let ok = match (left_ty, right_ty) {
                (_, Ty::Unknown) | (Ty::Unknown, Ty::List(_)) => true,
                (Ty::Scalar(l), Ty::List(e)) => l == e,
                (Ty::List(l), Ty::List(e)) => l == e,
                _ => false,
            };
            if !ok {
                self.issues.push(
                    Diagnostic::error(RuleCode::Type, "in-requires-matching-list")
                        .with_binding("left", left_ty.name())
                        .with_binding("right", right_ty.name()),
                );
            }
            return;
        }

        // == / != on mismatched types
        let compatible = match (left_ty, right_ty) {
            (Ty::Unknown, _) | (_, Ty::Unknown) => true,
            (a, b) if a == b => true,
            (Ty::List(e), Ty::Scalar(s)) | (Ty::Scalar(s), Ty::List(e)) => e == s,
            _ => false,
        };
        if !compatible {
            self.issues.push(
                Diagnostic::error(RuleCode::Type, "comparison-type-mismatch")
                    .with_binding("left", left_ty.name())
                    .with_binding("right", right_ty.name()),
            );
        }
    }

    /// Degree and longitude literals must stay inside their circles.
    fn check_degree_bounds(&mut self, prop_side: &Expr, value_side: &Expr) {
        let limit = match prop_side.accessed_prop() {
            Some(PropKind::Degree) => 30.0,
            Some(PropKind::Longitude) => 360.0,
            _ => return,
        };
        for n in numeric_literals(value_side) {
            if !(0.0..limit).contains(&n) {
                self.issues.push(
                    Diagnostic::error(RuleCode::DegreeRange, "degree-out-of-range")
                        .with_binding("got", n)
                        .with_binding("max", limit),
                );
            }
        }
    }

    /// `Planet.Ruler` yields the sign(s) the planet rules; comparing it to
    /// a planet name is a category error. `Sign.Ruler` yields planets and
    /// draws a mode warning when a modern-only ruler is expected under the
    /// traditional scheme.
    fn check_ruler_comparison(&mut self, left: &Expr, right: &Expr) {
        let planet_target = match left {
            Expr::Property { target, prop: PropKind::Ruler } => match target.as_ref() {
                Expr::Planet(p) => Some(*p),
                _ => None,
            },
            _ => None,
        };

        if let Some(planet) = planet_target {
            if let Some(expected) = referenced_planets(right).first() {
                self.issues.push(
                    Diagnostic::error(RuleCode::RulerMisuse, "ruler-compared-to-planet")
                        .with_binding("planet", planet.name())
                        .with_binding("got", expected.name())
                        .with_suggestion(format!("{}.Ruler == Aries", planet.name()))
                        .with_suggestion("Aries.Ruler == Mars"),
                );
            }
        }

        let sign_ruler_lhs = matches!(
            left,
            Expr::Property { target, prop: PropKind::Ruler } if matches!(target.as_ref(), Expr::Sign(_))
        );
        if sign_ruler_lhs && self.config.mode() == Mode::Traditional {
            if let Some(outer) = referenced_planets(right)
                .into_iter()
                .find(|p| p.is_modern_ruler())
            {
                self.issues.push(
                    Diagnostic::warning(RuleCode::ModeMismatch, "modern-ruler-in-traditional")
                        .with_binding("planet", outer.name()),
                );
            }
        }
    }

    /// Dignity consistency across one AND chain.
    fn analyze_conjunction(&mut self, leaves: &[&Expr]) {
        use std::collections::BTreeMap;

        let mut asserted_signs: BTreeMap<Planet, astrea_chart::Sign> = BTreeMap::new();
        let mut asserted_dignities: BTreeMap<Planet, Vec<Dignity>> = BTreeMap::new();

        for leaf in leaves {
            let Expr::Comparison { left, op: CmpOp::Eq, right } = leaf else {
                continue;
            };
            let Expr::Property { target, prop } = left.as_ref() else {
                continue;
            };
            let Expr::Planet(planet) = target.as_ref() else {
                continue;
            };
            match (prop, right.as_ref()) {
                (PropKind::Sign, Expr::Sign(sign)) => {
                    asserted_signs.entry(*planet).or_insert(*sign);
                }
                (PropKind::Dignity, Expr::Literal(Literal::Dignity(dignity))) => {
                    let dignities = asserted_dignities.entry(*planet).or_default();
                    if !dignities.contains(dignity) {
                        dignities.push(*dignity);
                    }
                }
                _ => {}
            }
        }

        for (planet, dignities) in &asserted_dignities {
            // A planet holds exactly one essential dignity at a time.
            if dignities.len() >= 2 {
                self.issues.push(
                    Diagnostic::error(RuleCode::DignityConflict, "conflicting-dignities")
                        .with_binding("planet", planet.name())
                        .with_binding("first", dignities[0].name())
                        .with_binding("second", dignities[1].name()),
                );
            }

            let Some(sign) = asserted_signs.get(planet) else {
                continue;
            };
            for dignity in dignities {
                let holds = match dignity {
                    Dignity::Rulership => self.config.rulers_of(*sign).contains(planet),
                    Dignity::Exaltation => self.config.exaltation(*planet) == Some(*sign),
                    Dignity::Detriment => self.config.detriments(*planet).contains(sign),
                    Dignity::Fall => self.config.fall(*planet) == Some(*sign),
                    Dignity::Neutral | Dignity::Peregrine => continue,
                };
                if !holds {
                    let expected = match dignity {
                        Dignity::Exaltation => self.config.exaltation(*planet),
                        Dignity::Fall => self.config.fall(*planet),
                        _ => None,
                    };
                    let mut diagnostic =
                        Diagnostic::error(RuleCode::DignitySignMismatch, "dignity-sign-mismatch")
                            .with_binding("planet", planet.name())
                            .with_binding("dignity", dignity.name())
                            .with_binding("sign", sign.name());
                    if let Some(expected) = expected {
                        diagnostic = diagnostic.with_binding("expected", expected.name());
                    }
                    self.issues.push(diagnostic);
                }
            }
        }
    }

    fn push_bad_property(&mut self, prop: PropKind, target: &str) {
        self.issues.push(
            Diagnostic::error(RuleCode::Type, "property-not-on-target")
                .with_binding("property", prop.name())
                .with_binding("target", target),
        );
    }

    // ============================================
    // Static typing
    // ============================================

    fn infer(&self, expr: &Expr, scope: Option<DomainKind>) -> Ty {
        match expr {
            Expr::Literal(Literal::Bool(_)) => Ty::Scalar(Scalar::Bool),
            Expr::Literal(Literal::Number(_)) => Ty::Scalar(Scalar::Number),
            Expr::Literal(Literal::Str(_)) => Ty::Scalar(Scalar::Str),
            Expr::Literal(Literal::Dignity(_)) => Ty::Scalar(Scalar::Dignity),
            Expr::Literal(Literal::Aspect(_)) => Ty::Scalar(Scalar::Aspect),
            Expr::Planet(_) => Ty::Scalar(Scalar::Planet),
            Expr::Sign(_) => Ty::Scalar(Scalar::Sign),
            Expr::Angle(_) => Ty::Unknown,
            Expr::House(_) => Ty::Scalar(Scalar::Number),
            Expr::List(elements) => {
                let mut elem: Option<Scalar> = None;
                for element in elements {
                    match self.infer(element, scope) {
                        Ty::Scalar(s) => match elem {
                            None => elem = Some(s),
                            Some(prev) if prev == s => {}
                            Some(_) => return Ty::Unknown,
                        },
                        _ => return Ty::Unknown,
                    }
                }
                elem.map(Ty::List).unwrap_or(Ty::Unknown)
            }
            Expr::Property { target, prop } => match target.as_ref() {
                Expr::Planet(_) => planet_prop_ty(*prop).unwrap_or(Ty::Unknown),
                Expr::Sign(_) => sign_prop_ty(*prop).unwrap_or(Ty::Unknown),
                Expr::Angle(_) => angle_prop_ty(*prop).unwrap_or(Ty::Unknown),
                inner => match self.infer(inner, scope) {
                    Ty::Scalar(Scalar::Sign) => sign_prop_ty(*prop).unwrap_or(Ty::Unknown),
                    Ty::Scalar(Scalar::Planet) => planet_prop_ty(*prop).unwrap_or(Ty::Unknown),
                    _ => Ty::Unknown,
                },
            },
            Expr::Bound(prop) => scope
                .and_then(|domain| bound_prop_ty(domain, *prop))
                .unwrap_or(Ty::Unknown),
            Expr::Comparison { .. }
            | Expr::Aspect { .. }
            | Expr::Aggregate { .. }
            | Expr::And { .. }
            | Expr::Or { .. }
            | Expr::Not { .. } => Ty::Scalar(Scalar::Bool),
            Expr::Count { .. } => Ty::Scalar(Scalar::Number),
        }
    }
}

fn planet_prop_ty(prop: PropKind) -> Option<Ty> {
    match prop {
        PropKind::Sign => Some(Ty::Scalar(Scalar::Sign)),
        PropKind::House
        | PropKind::Degree
        | PropKind::Speed
        | PropKind::Longitude => Some(Ty::Scalar(Scalar::Number)),
        PropKind::Retrograde => Some(Ty::Scalar(Scalar::Bool)),
        PropKind::Dignity => Some(Ty::Scalar(Scalar::Dignity)),
        PropKind::Ruler => Some(Ty::List(Scalar::Sign)),
        PropKind::PlanetsCount | PropKind::Kind | PropKind::Orb | PropKind::Applying => None,
    }
}

fn sign_prop_ty(prop: PropKind) -> Option<Ty> {
    match prop {
        PropKind::Ruler => Some(Ty::List(Scalar::Planet)),
        PropKind::PlanetsCount => Some(Ty::Scalar(Scalar::Number)),
        _ => None,
    }
}

fn angle_prop_ty(prop: PropKind) -> Option<Ty> {
    match prop {
        PropKind::Sign => Some(Ty::Scalar(Scalar::Sign)),
        PropKind::Degree | PropKind::Longitude | PropKind::House => Some(Ty::Scalar(Scalar::Number)),
        PropKind::Retrograde => Some(Ty::Scalar(Scalar::Bool)),
        _ => None,
    }
}

fn bound_prop_ty(domain: DomainKind, prop: PropKind) -> Option<Ty> {
    match domain {
        DomainKind::Planets => planet_prop_ty(prop),
        DomainKind::Aspects => match prop {
            PropKind::Kind => Some(Ty::Scalar(Scalar::Aspect)),
            PropKind::Orb => Some(Ty::Scalar(Scalar::Number)),
            PropKind::Applying => Some(Ty::Scalar(Scalar::Bool)),
            _ => None,
        },
        DomainKind::Houses => match prop {
            PropKind::PlanetsCount => Some(Ty::Scalar(Scalar::Number)),
            PropKind::Sign => Some(Ty::Scalar(Scalar::Sign)),
            _ => None,
        },
        DomainKind::Signs => match prop {
            PropKind::PlanetsCount => Some(Ty::Scalar(Scalar::Number)),
            PropKind::Ruler => Some(Ty::List(Scalar::Planet)),
            _ => None,
        },
    }
}

/// Leaves of a maximal AND chain, left to right.
fn collect_and_leaves<'e>(expr: &'e Expr, out: &mut Vec<&'e Expr>) {
    match expr {
        Expr::And { left, right } => {
            collect_and_leaves(left, out);
            collect_and_leaves(right, out);
        }
        other => out.push(other),
    }
}

/// Planets statically referenced by a value expression (bare or in lists).
fn referenced_planets(expr: &Expr) -> Vec<Planet> {
    match expr {
        Expr::Planet(planet) => vec![*planet],
        Expr::List(elements) => elements.iter().flat_map(referenced_planets).collect(),
        _ => Vec::new(),
    }
}

/// Numeric literals on one side of a comparison (bare or in lists).
fn numeric_literals(expr: &Expr) -> Vec<f64> {
    match expr {
        Expr::Literal(Literal::Number(n)) => vec![*n],
        Expr::List(elements) => elements.iter().flat_map(numeric_literals).collect(),
        _ => Vec::new(),
    }
}
