//! Formula evaluator
//!
//! Walks a validated AST against a read-only chart. Boolean operators
//! short-circuit left to right and aggregators stop at the first deciding
//! element; both behaviors are observable through the [`ChartSource`]
//! seam and are part of the contract.
//!
//! The evaluator assumes the validator ran: type errors surfacing here
//! mean validation was bypassed and are reported as [`Error::TypeMismatch`].

use crate::ast::{CmpOp, DomainKind, Expr, Literal, PropKind, Quantifier};
use crate::error::{Error, Result};
use astrea_chart::{
    circular_delta, AspectHit, AspectKind, ChartSource, Dignity, DignityConfig, Planet,
    PlanetState, Sign,
};

/// Result of evaluating a (sub)expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Str(String),
    Planet(Planet),
    Sign(Sign),
    Dignity(Dignity),
    Aspect(AspectKind),
    List(Vec<Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "Bool",
            Value::Number(_) => "Number",
            Value::Str(_) => "String",
            Value::Planet(_) => "Planet",
            Value::Sign(_) => "Sign",
            Value::Dignity(_) => "Dignity",
            Value::Aspect(_) => "Aspect",
            Value::List(_) => "List",
        }
    }
}

/// The element an aggregator has currently bound.
enum Binding<'a> {
    Planet(Planet, &'a PlanetState),
    Aspect(&'a AspectHit),
    House(u8),
    Sign(Sign),
}

/// Evaluate a formula against a chart. The outermost expression must
/// reduce to a boolean.
pub fn evaluate(expr: &Expr, chart: &dyn ChartSource, config: &DignityConfig) -> Result<bool> {
    Evaluator::new(chart, config).evaluate_bool(expr)
}

/// Tree-walking evaluator over one chart
pub struct Evaluator<'a> {
    chart: &'a dyn ChartSource,
    config: &'a DignityConfig,
    /// Planets enumerated by the `planet` domain.
    domain: &'a [Planet],
}

impl<'a> Evaluator<'a> {
    pub fn new(chart: &'a dyn ChartSource, config: &'a DignityConfig) -> Self {
        Self {
            chart,
            config,
            domain: &Planet::CLASSICAL,
        }
    }

    /// Evaluator with a custom planet domain (Chiron, nodes, ...).
    pub fn with_domain(
        chart: &'a dyn ChartSource,
        config: &'a DignityConfig,
        domain: &'a [Planet],
    ) -> Self {
        Self {
            chart,
            config,
            domain,
        }
    }

    pub fn evaluate_bool(&self, expr: &Expr) -> Result<bool> {
        self.eval(expr, None)?.as_bool().ok_or(Error::NotABoolean)
    }

    pub fn evaluate(&self, expr: &Expr) -> Result<Value> {
        self.eval(expr, None)
    }

    fn eval(&self, expr: &Expr, binding: Option<&Binding<'_>>) -> Result<Value> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::Str(s) => Value::Str(s.clone()),
                Literal::Dignity(d) => Value::Dignity(*d),
                Literal::Aspect(a) => Value::Aspect(*a),
            }),
            Expr::List(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval(element, binding)?);
                }
                Ok(Value::List(values))
            }
            Expr::Planet(planet) => Ok(Value::Planet(*planet)),
            Expr::Sign(sign) => Ok(Value::Sign(*sign)),
            Expr::Angle(_) => Err(Error::TypeMismatch(
                "an angle is not a value; access one of its properties".into(),
            )),
            Expr::House(n) => Ok(Value::Number(f64::from(*n))),
            Expr::Property { target, prop } => self.eval_property(target, *prop, binding),
            Expr::Bound(prop) => match binding {
                Some(bound) => self.bound_prop(bound, *prop),
                None => Err(Error::Internal(
                    "scoped property evaluated outside an aggregator".into(),
                )),
            },
            Expr::Comparison { left, op, right } => {
                let left = self.eval(left, binding)?;
                let right = self.eval(right, binding)?;
                self.compare(&left, *op, &right).map(Value::Bool)
            }
            Expr::Aspect { p1, p2, kind, orb } => {
                self.eval_aspect(p1, p2, *kind, *orb, binding).map(Value::Bool)
            }
            Expr::Aggregate {
                quantifier,
                domain,
                filter,
                body,
            } => self
                .eval_aggregate(*quantifier, *domain, filter.as_deref(), body)
                .map(Value::Bool),
            Expr::Count { domain, filter } => self
                .eval_count(*domain, filter.as_deref())
                .map(|n| Value::Number(n as f64)),
            Expr::And { left, right } => {
                // Short-circuit: the right side is not evaluated when the
                // left already decides.
                if !self.eval_inner_bool(left, binding)? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval_inner_bool(right, binding)?))
            }
            Expr::Or { left, right } => {
                if self.eval_inner_bool(left, binding)? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval_inner_bool(right, binding)?))
            }
            Expr::Not { expr } => Ok(Value::Bool(!self.eval_inner_bool(expr, binding)?)),
        }
    }

    fn eval_inner_bool(&self, expr: &Expr, binding: Option<&Binding<'_>>) -> Result<bool> {
        let value = self.eval(expr, binding)?;
        value.as_bool().ok_or_else(|| {
            Error::TypeMismatch(format!("expected a boolean, got {}", value.type_name()))
        })
    }

    // ============================================
    // Property access
    // ============================================

    fn eval_property(
        &self,
        target: &Expr,
        prop: PropKind,
        binding: Option<&Binding<'_>>,
    ) -> Result<Value> {
        match target {
            Expr::Planet(planet) => self.planet_prop(*planet, prop),
            Expr::Sign(sign) => self.sign_prop(*sign, prop),
            Expr::Angle(angle) => self.angle_prop(*angle, prop),
            chained => match self.eval(chained, binding)? {
                Value::Planet(planet) => self.planet_prop(planet, prop),
                Value::Sign(sign) => self.sign_prop(sign, prop),
                other => Err(Error::TypeMismatch(format!(
                    "property {} is not available on {}",
                    prop.name(),
                    other.type_name()
                ))),
            },
        }
    }

    fn planet_prop(&self, planet: Planet, prop: PropKind) -> Result<Value> {
        let state = self
            .chart
            .planet_state(planet)
            .ok_or_else(|| Error::UnknownPlanet(planet.name().to_string()))?;
        self.planet_state_prop(planet, state, prop)
    }

    fn planet_state_prop(
        &self,
        planet: Planet,
        state: &PlanetState,
        prop: PropKind,
    ) -> Result<Value> {
        match prop {
            PropKind::Sign => Ok(Value::Sign(state.sign)),
            PropKind::House => Ok(Value::Number(f64::from(state.house))),
            PropKind::Degree => Ok(Value::Number(state.degree_in_sign)),
            PropKind::Retrograde => Ok(Value::Bool(state.retrograde)),
            PropKind::Dignity => Ok(Value::Dignity(state.dignity)),
            PropKind::Speed => Ok(Value::Number(state.speed)),
            PropKind::Longitude => Ok(Value::Number(state.longitude)),
            // The sign(s) this planet rules under the active configuration.
            PropKind::Ruler => Ok(signs_value(self.config.signs_ruled_by(planet).as_slice())),
            other => Err(Error::TypeMismatch(format!(
                "property {} is not available on a planet",
                other.name()
            ))),
        }
    }

    fn sign_prop(&self, sign: Sign, prop: PropKind) -> Result<Value> {
        match prop {
            PropKind::Ruler => Ok(planets_value(self.config.rulers_of(sign))),
            PropKind::PlanetsCount => Ok(Value::Number(
                self.count_domain_planets(|state| state.sign == sign) as f64,
            )),
            other => Err(Error::TypeMismatch(format!(
                "property {} is not available on a sign",
                other.name()
            ))),
        }
    }

    fn angle_prop(&self, angle: astrea_chart::Angle, prop: PropKind) -> Result<Value> {
        let longitude = self.chart.angle_longitude(angle);
        match prop {
            PropKind::Sign => Ok(Value::Sign(Sign::from_longitude(longitude))),
            PropKind::Degree => Ok(Value::Number(longitude.rem_euclid(360.0) % 30.0)),
            PropKind::Longitude => Ok(Value::Number(longitude)),
            // Angles are points, not bodies; they never retrograde.
            PropKind::Retrograde => Ok(Value::Bool(false)),
            PropKind::House => Ok(Value::Number((angle.cusp_index() + 1) as f64)),
            other => Err(Error::TypeMismatch(format!(
                "property {} is not available on an angle",
                other.name()
            ))),
        }
    }

    fn bound_prop(&self, binding: &Binding<'_>, prop: PropKind) -> Result<Value> {
        match binding {
            Binding::Planet(planet, state) => self.planet_state_prop(*planet, state, prop),
            Binding::Aspect(hit) => match prop {
                PropKind::Kind => Ok(Value::Aspect(hit.kind)),
                PropKind::Orb => Ok(Value::Number(hit.orb)),
                PropKind::Applying => Ok(Value::Bool(hit.applying)),
                other => Err(Error::TypeMismatch(format!(
                    "property {} is not available on an aspect",
                    other.name()
                ))),
            },
            Binding::House(house) => match prop {
                PropKind::PlanetsCount => Ok(Value::Number(
                    self.count_domain_planets(|state| state.house == *house) as f64,
                )),
                PropKind::Sign => Ok(Value::Sign(Sign::from_longitude(
                    self.chart.houses()[usize::from(*house) - 1],
                ))),
                other => Err(Error::TypeMismatch(format!(
                    "property {} is not available on a house",
                    other.name()
                ))),
            },
            Binding::Sign(sign) => self.sign_prop(*sign, prop),
        }
    }

    fn count_domain_planets(&self, predicate: impl Fn(&PlanetState) -> bool) -> usize {
        self.domain
            .iter()
            .filter_map(|planet| self.chart.planet_state(*planet))
            .filter(|state| predicate(state))
            .count()
    }

    // ============================================
    // Comparison
    // ============================================

    fn compare(&self, left: &Value, op: CmpOp, right: &Value) -> Result<bool> {
        match op {
            CmpOp::Eq => self.values_equal(left, right),
            CmpOp::Ne => self.values_equal(left, right).map(|eq| !eq),
            CmpOp::In => self.value_in(left, right),
            _ => {
                let (Some(l), Some(r)) = (left.as_number(), right.as_number()) else {
                    return Err(Error::TypeMismatch(format!(
                        "{} {} {} requires numbers",
                        left.type_name(),
                        op,
                        right.type_name()
                    )));
                };
                Ok(match op {
                    CmpOp::Lt => l < r,
                    CmpOp::Le => l <= r,
                    CmpOp::Gt => l > r,
                    CmpOp::Ge => l >= r,
                    _ => unreachable!(),
                })
            }
        }
    }

    fn values_equal(&self, left: &Value, right: &Value) -> Result<bool> {
        match (left, right) {
            (Value::Bool(l), Value::Bool(r)) => Ok(l == r),
            (Value::Number(l), Value::Number(r)) => Ok(l == r),
            (Value::Str(l), Value::Str(r)) => Ok(l.eq_ignore_ascii_case(r)),
            (Value::Planet(l), Value::Planet(r)) => Ok(l == r),
            (Value::Sign(l), Value::Sign(r)) => Ok(l == r),
            (Value::Dignity(l), Value::Dignity(r)) => Ok(l == r),
            (Value::Aspect(l), Value::Aspect(r)) => Ok(l == r),
            (Value::List(l), Value::List(r)) => {
                if l.len() != r.len() {
                    return Ok(false);
                }
                for (a, b) in l.iter().zip(r) {
                    if !self.values_equal(a, b)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            // A set against a scalar matches on membership: modern co-ruler
            // sets make `Scorpio.Ruler == Pluto` hold.
            (Value::List(list), scalar) | (scalar, Value::List(list)) => {
                for member in list {
                    if self.values_equal(member, scalar)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            (l, r) => Err(Error::TypeMismatch(format!(
                "cannot compare {} with {}",
                l.type_name(),
                r.type_name()
            ))),
        }
    }

    fn value_in(&self, left: &Value, right: &Value) -> Result<bool> {
        let Value::List(members) = right else {
            return Err(Error::TypeMismatch(format!(
                "IN requires a list on the right, got {}",
                right.type_name()
            )));
        };
        match left {
            // Subset test for list-valued left sides.
            Value::List(subset) => {
                for needle in subset {
                    if !self.scalar_in(needle, members)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            scalar => self.scalar_in(scalar, members),
        }
    }

    fn scalar_in(&self, needle: &Value, members: &[Value]) -> Result<bool> {
        for member in members {
            if self.values_equal(needle, member)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // ============================================
    // Aspects
    // ============================================

    fn eval_aspect(
        &self,
        p1: &Expr,
        p2: &Expr,
        kind: AspectKind,
        orb: Option<f64>,
        binding: Option<&Binding<'_>>,
    ) -> Result<bool> {
        let left = self.planet_operands(p1, binding)?;
        let right = self.planet_operands(p2, binding)?;
        let limit = orb.unwrap_or_else(|| self.config.canonical_orb(kind));

        for a in &left {
            for b in &right {
                if a == b {
                    continue;
                }
                if self.aspect_holds(*a, *b, kind, limit)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Pair test, symmetric in its arguments. Prefers the producer's
    /// aspect list; a chart shipped without one falls back to the circular
    /// metric over the two longitudes.
    fn aspect_holds(&self, a: Planet, b: Planet, kind: AspectKind, limit: f64) -> Result<bool> {
        let aspects = self.chart.aspects();
        if !aspects.is_empty() {
            return Ok(aspects
                .iter()
                .any(|hit| hit.involves(a, b) && hit.kind == kind && hit.orb <= limit));
        }

        let (Some(state_a), Some(state_b)) =
            (self.chart.planet_state(a), self.chart.planet_state(b))
        else {
            return Ok(false);
        };
        let separation = circular_delta(state_a.longitude, state_b.longitude);
        let deviation = (separation - self.config.aspect_angle(kind)).abs();
        Ok(deviation <= limit)
    }

    fn planet_operands(
        &self,
        expr: &Expr,
        binding: Option<&Binding<'_>>,
    ) -> Result<Vec<Planet>> {
        match self.eval(expr, binding)? {
            Value::Planet(planet) => Ok(vec![planet]),
            Value::List(values) => values
                .into_iter()
                .map(|value| match value {
                    Value::Planet(planet) => Ok(planet),
                    other => Err(Error::TypeMismatch(format!(
                        "aspect argument must name planets, got {}",
                        other.type_name()
                    ))),
                })
                .collect(),
            other => Err(Error::TypeMismatch(format!(
                "aspect argument must name planets, got {}",
                other.type_name()
            ))),
        }
    }

    // ============================================
    // Aggregators
    // ============================================

    fn eval_aggregate(
        &self,
        quantifier: Quantifier,
        domain: DomainKind,
        filter: Option<&Expr>,
        body: &Expr,
    ) -> Result<bool> {
        let mut outcome = match quantifier {
            Quantifier::Any => false,
            // Vacuously true over an empty (or fully filtered) domain.
            Quantifier::All => true,
        };

        self.for_each_binding(domain, |binding| {
            if let Some(filter) = filter {
                if !self.eval_inner_bool(filter, Some(binding))? {
                    return Ok(true); // element filtered out, keep going
                }
            }
            let holds = self.eval_inner_bool(body, Some(binding))?;
            match quantifier {
                Quantifier::Any if holds => {
                    outcome = true;
                    Ok(false) // short-circuit: first hit decides
                }
                Quantifier::All if !holds => {
                    outcome = false;
                    Ok(false) // short-circuit: first miss decides
                }
                _ => Ok(true),
            }
        })?;

        Ok(outcome)
    }

    fn eval_count(&self, domain: DomainKind, filter: Option<&Expr>) -> Result<usize> {
        let mut count = 0usize;
        self.for_each_binding(domain, |binding| {
            let keep = match filter {
                Some(filter) => self.eval_inner_bool(filter, Some(binding))?,
                None => true,
            };
            if keep {
                count += 1;
            }
            Ok(true)
        })?;
        Ok(count)
    }

    /// Enumerate a domain eagerly, calling `visit` per element. The visitor
    /// returns `false` to stop early.
    fn for_each_binding(
        &self,
        domain: DomainKind,
        mut visit: impl FnMut(&Binding<'_>) -> Result<bool>,
    ) -> Result<()> {
        match domain {
            DomainKind::Planets => {
                for planet in self.domain {
                    // Planets absent from the chart are outside the domain.
                    let Some(state) = self.chart.planet_state(*planet) else {
                        continue;
                    };
                    if !visit(&Binding::Planet(*planet, state))? {
                        return Ok(());
                    }
                }
            }
            DomainKind::Aspects => {
                for hit in self.chart.aspects() {
                    if !visit(&Binding::Aspect(hit))? {
                        return Ok(());
                    }
                }
            }
            DomainKind::Houses => {
                for house in 1..=12u8 {
                    if !visit(&Binding::House(house))? {
                        return Ok(());
                    }
                }
            }
            DomainKind::Signs => {
                for sign in Sign::ALL {
                    if !visit(&Binding::Sign(sign))? {
                        return Ok(());
                    }
                }
            }
        }
        Ok(())
    }
}

fn planets_value(planets: &[Planet]) -> Value {
    match planets {
        [single] => Value::Planet(*single),
        many => Value::List(many.iter().map(|p| Value::Planet(*p)).collect()),
    }
}

fn signs_value(signs: &[Sign]) -> Value {
    match signs {
        [single] => Value::Sign(*single),
        many => Value::List(many.iter().map(|s| Value::Sign(*s)).collect()),
    }
}
