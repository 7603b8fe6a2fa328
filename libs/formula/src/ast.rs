//! Abstract syntax tree for formulas
//!
//! The AST is a closed tagged sum: every addressable property is a
//! [`PropKind`] variant and every name the parser accepts resolves to a
//! typed reference, so the validator's rules are decidable without any
//! dynamic attribute lookup.
//!
//! `Display` renders the canonical surface syntax; parsing the rendered
//! text yields a structurally equal tree (grouping parentheses do not
//! appear as nodes).

use astrea_chart::{Angle, AspectKind, Dignity, Planet, Sign};
use std::fmt;

/// Literal values appearing in formulas.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Number(f64),
    Str(String),
    Dignity(Dignity),
    Aspect(AspectKind),
}

/// The closed set of properties formulas can access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropKind {
    Sign,
    House,
    Degree,
    Retrograde,
    Dignity,
    Speed,
    Longitude,
    Ruler,
    /// Number of domain planets in a house or sign.
    PlanetsCount,
    /// Aspect-entry fields, available in the `aspect` domain.
    Kind,
    Orb,
    Applying,
}

impl PropKind {
    /// Case-insensitive property name lookup.
    pub fn lookup(name: &str) -> Option<PropKind> {
        match name.to_ascii_lowercase().as_str() {
            "sign" => Some(PropKind::Sign),
            "house" => Some(PropKind::House),
            "degree" => Some(PropKind::Degree),
            "retrograde" => Some(PropKind::Retrograde),
            "dignity" => Some(PropKind::Dignity),
            "speed" => Some(PropKind::Speed),
            "longitude" => Some(PropKind::Longitude),
            "ruler" => Some(PropKind::Ruler),
            "planetscount" => Some(PropKind::PlanetsCount),
            "kind" => Some(PropKind::Kind),
            "orb" => Some(PropKind::Orb),
            "applying" => Some(PropKind::Applying),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PropKind::Sign => "Sign",
            PropKind::House => "House",
            PropKind::Degree => "Degree",
            PropKind::Retrograde => "Retrograde",
            PropKind::Dignity => "Dignity",
            PropKind::Speed => "Speed",
            PropKind::Longitude => "Longitude",
            PropKind::Ruler => "Ruler",
            PropKind::PlanetsCount => "PlanetsCount",
            PropKind::Kind => "Kind",
            PropKind::Orb => "Orb",
            PropKind::Applying => "Applying",
        }
    }
}

impl fmt::Display for PropKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comparison operator: `==` | `!=` | `<` | `<=` | `>` | `>=` | `IN`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
}

impl CmpOp {
    pub fn is_ordering(self) -> bool {
        matches!(self, CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::In => "IN",
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Aggregation quantifier: `any` | `all`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Any,
    All,
}

impl Quantifier {
    pub fn keyword(self) -> &'static str {
        match self {
            Quantifier::Any => "any",
            Quantifier::All => "all",
        }
    }
}

/// Enumerable domain of an aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainKind {
    Planets,
    Aspects,
    Houses,
    Signs,
}

impl DomainKind {
    /// Accepts both singular and plural spellings, case-insensitively.
    pub fn lookup(name: &str) -> Option<DomainKind> {
        match name.to_ascii_lowercase().as_str() {
            "planet" | "planets" => Some(DomainKind::Planets),
            "aspect" | "aspects" => Some(DomainKind::Aspects),
            "house" | "houses" => Some(DomainKind::Houses),
            "sign" | "signs" => Some(DomainKind::Signs),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            DomainKind::Planets => "planet",
            DomainKind::Aspects => "aspect",
            DomainKind::Houses => "house",
            DomainKind::Signs => "sign",
        }
    }
}

/// A formula expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),

    /// List literal: `[Aries, Leo, Sagittarius]`
    List(Vec<Expr>),

    Planet(Planet),
    Sign(Sign),
    Angle(Angle),

    /// House number in a house-valued position, e.g. the `10` of
    /// `Moon.House == 10`. Range-checked by the validator.
    House(u32),

    /// Property access: `Sun.Sign`, `Aries.Ruler`, `Sun.Sign.Ruler`
    Property { target: Box<Expr>, prop: PropKind },

    /// Property of the element bound by the nearest enclosing aggregator,
    /// e.g. the bare `Sign` in `any(planet WHERE Sign == Leo)`.
    Bound(PropKind),

    Comparison {
        left: Box<Expr>,
        op: CmpOp,
        right: Box<Expr>,
    },

    /// Aspect predicate: `Asp(Mars, Saturn, Conj, orb<5)`. Either planet
    /// position may be a list; membership fans out over the pairs.
    Aspect {
        p1: Box<Expr>,
        p2: Box<Expr>,
        kind: AspectKind,
        orb: Option<f64>,
    },

    /// `any(domain WHERE filter).Prop op value` / `all(...)`
    Aggregate {
        quantifier: Quantifier,
        domain: DomainKind,
        filter: Option<Box<Expr>>,
        body: Box<Expr>,
    },

    /// `count(domain, filter)`, numeric, used inside comparisons
    Count {
        domain: DomainKind,
        filter: Option<Box<Expr>>,
    },

    And { left: Box<Expr>, right: Box<Expr> },
    Or { left: Box<Expr>, right: Box<Expr> },
    Not { expr: Box<Expr> },
}

impl Expr {
    pub fn number(n: f64) -> Expr {
        Expr::Literal(Literal::Number(n))
    }

    pub fn boolean(b: bool) -> Expr {
        Expr::Literal(Literal::Bool(b))
    }

    /// The property accessed, when this is a plain or bound access.
    pub fn accessed_prop(&self) -> Option<PropKind> {
        match self {
            Expr::Property { prop, .. } => Some(*prop),
            Expr::Bound(prop) => Some(*prop),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(true) => f.write_str("True"),
            Literal::Bool(false) => f.write_str("False"),
            Literal::Number(n) => write!(f, "{n}"),
            Literal::Str(s) => write!(f, "\"{s}\""),
            Literal::Dignity(d) => write!(f, "{d}"),
            Literal::Aspect(a) => write!(f, "{a}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(lit) => write!(f, "{lit}"),
            Expr::List(elements) => {
                f.write_str("[")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{e}")?;
                }
                f.write_str("]")
            }
            Expr::Planet(p) => write!(f, "{p}"),
            Expr::Sign(s) => write!(f, "{s}"),
            Expr::Angle(a) => write!(f, "{a}"),
            Expr::House(n) => write!(f, "{n}"),
            Expr::Property { target, prop } => write!(f, "{target}.{prop}"),
            Expr::Bound(prop) => write!(f, "{prop}"),
            Expr::Comparison { left, op, right } => write!(f, "{left} {op} {right}"),
            Expr::Aspect { p1, p2, kind, orb } => {
                write!(f, "Asp({p1}, {p2}, {kind}")?;
                if let Some(orb) = orb {
                    write!(f, ", orb<{orb}")?;
                }
                f.write_str(")")
            }
            Expr::Aggregate {
                quantifier,
                domain,
                filter,
                body,
            } => {
                write!(f, "{}({}", quantifier.keyword(), domain.keyword())?;
                if let Some(filter) = filter {
                    write!(f, " WHERE {filter}")?;
                }
                f.write_str(")")?;
                // The body is a comparison on the bound element; print it
                // as the `.Prop op value` suffix it was parsed from.
                match body.as_ref() {
                    Expr::Comparison { left, op, right } => match left.as_ref() {
                        Expr::Bound(prop) => write!(f, ".{prop} {op} {right}"),
                        other => write!(f, ".{other} {op} {right}"),
                    },
                    other => write!(f, ".{other}"),
                }
            }
            Expr::Count { domain, filter } => {
                write!(f, "count({}", domain.keyword())?;
                if let Some(filter) = filter {
                    write!(f, ", {filter}")?;
                }
                f.write_str(")")
            }
            Expr::And { left, right } => write!(f, "({left} AND {right})"),
            Expr::Or { left, right } => write!(f, "({left} OR {right})"),
            Expr::Not { expr } => write!(f, "(NOT {expr})"),
        }
    }
}
