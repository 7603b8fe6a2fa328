//! Unit tests for the formula parser

use astrea_chart::{AspectKind, Dignity, Planet, Sign};
use astrea_formula::ast::{CmpOp, DomainKind, Expr, Literal, PropKind, Quantifier};
use astrea_formula::{parse, Error};

fn planet(p: Planet) -> Box<Expr> {
    Box::new(Expr::Planet(p))
}

fn prop(p: Planet, prop: PropKind) -> Box<Expr> {
    Box::new(Expr::Property {
        target: planet(p),
        prop,
    })
}

#[test]
fn test_parse_simple_comparison() {
    let ast = parse("Sun.Sign == Aries").unwrap();
    assert_eq!(
        ast,
        Expr::Comparison {
            left: prop(Planet::Sun, PropKind::Sign),
            op: CmpOp::Eq,
            right: Box::new(Expr::Sign(Sign::Aries)),
        }
    );
}

#[test]
fn test_parse_case_insensitive_names() {
    assert_eq!(parse("sun.sign == ARIES").unwrap(), parse("Sun.Sign == Aries").unwrap());
    assert_eq!(parse("sun.sign == aries AND true").unwrap(), parse("Sun.Sign == Aries && TRUE").unwrap());
}

#[test]
fn test_parse_operator_aliases() {
    assert_eq!(
        parse("Sun.Sign == Aries && Moon.House == 7").unwrap(),
        parse("Sun.Sign == Aries AND Moon.House == 7").unwrap()
    );
    assert_eq!(
        parse("Sun.Sign == Aries || Moon.House == 7").unwrap(),
        parse("Sun.Sign == Aries OR Moon.House == 7").unwrap()
    );
    assert_eq!(
        parse("!Mercury.Retrograde").unwrap(),
        parse("NOT Mercury.Retrograde").unwrap()
    );
}

#[test]
fn test_precedence_not_and_or() {
    // NOT a AND b OR c parses as ((NOT a) AND b) OR c
    let ast = parse("NOT Mercury.Retrograde AND Mars.House == 1 OR Venus.Sign == Taurus").unwrap();
    let expected = Expr::Or {
        left: Box::new(Expr::And {
            left: Box::new(Expr::Not {
                expr: prop(Planet::Mercury, PropKind::Retrograde),
            }),
            right: Box::new(Expr::Comparison {
                left: prop(Planet::Mars, PropKind::House),
                op: CmpOp::Eq,
                right: Box::new(Expr::House(1)),
            }),
        }),
        right: Box::new(Expr::Comparison {
            left: prop(Planet::Venus, PropKind::Sign),
            op: CmpOp::Eq,
            right: Box::new(Expr::Sign(Sign::Taurus)),
        }),
    };
    assert_eq!(ast, expected);
}

#[test]
fn test_parens_override_precedence() {
    let grouped = parse("(Sun.Sign == Aries OR Sun.Sign == Leo) AND NOT Mercury.Retrograde").unwrap();
    match grouped {
        Expr::And { left, .. } => assert!(matches!(*left, Expr::Or { .. })),
        other => panic!("expected AND at the root, got {other:?}"),
    }
}

#[test]
fn test_and_or_left_associative() {
    let ast = parse("Mercury.Retrograde AND Venus.Retrograde AND Mars.Retrograde").unwrap();
    match ast {
        Expr::And { left, .. } => assert!(matches!(*left, Expr::And { .. })),
        other => panic!("expected nested AND on the left, got {other:?}"),
    }
}

#[test]
fn test_house_literals_become_house_nodes() {
    let ast = parse("Moon.House == 7").unwrap();
    match ast {
        Expr::Comparison { right, .. } => assert_eq!(*right, Expr::House(7)),
        other => panic!("expected comparison, got {other:?}"),
    }

    // Out-of-range numbers still parse; the validator range-checks them.
    let ast = parse("Moon.House == 15").unwrap();
    match ast {
        Expr::Comparison { right, .. } => assert_eq!(*right, Expr::House(15)),
        other => panic!("expected comparison, got {other:?}"),
    }

    // Fractional numbers stay numeric literals.
    let ast = parse("Moon.House == 7.5").unwrap();
    match ast {
        Expr::Comparison { right, .. } => {
            assert_eq!(*right, Expr::Literal(Literal::Number(7.5)))
        }
        other => panic!("expected comparison, got {other:?}"),
    }
}

#[test]
fn test_parse_list_and_in() {
    let ast = parse("Sun.Sign IN [Aries, Leo, Sagittarius]").unwrap();
    match ast {
        Expr::Comparison { op, right, .. } => {
            assert_eq!(op, CmpOp::In);
            assert_eq!(
                *right,
                Expr::List(vec![
                    Expr::Sign(Sign::Aries),
                    Expr::Sign(Sign::Leo),
                    Expr::Sign(Sign::Sagittarius),
                ])
            );
        }
        other => panic!("expected comparison, got {other:?}"),
    }
}

#[test]
fn test_empty_list_is_rejected() {
    assert!(matches!(parse("Sun.Sign IN []"), Err(Error::EmptyList { .. })));
}

#[test]
fn test_parse_aspect_call() {
    let ast = parse("Asp(Mars, Saturn, Conj)").unwrap();
    assert_eq!(
        ast,
        Expr::Aspect {
            p1: planet(Planet::Mars),
            p2: planet(Planet::Saturn),
            kind: AspectKind::Conj,
            orb: None,
        }
    );

    let ast = parse("Asp(Mars, Saturn, Conj, orb<5)").unwrap();
    match ast {
        Expr::Aspect { orb, .. } => assert_eq!(orb, Some(5.0)),
        other => panic!("expected aspect call, got {other:?}"),
    }
}

#[test]
fn test_parse_aspect_call_with_list() {
    let ast = parse("Asp(Mars, [Saturn, Pluto], Conj)").unwrap();
    match ast {
        Expr::Aspect { p2, .. } => assert_eq!(
            *p2,
            Expr::List(vec![Expr::Planet(Planet::Saturn), Expr::Planet(Planet::Pluto)])
        ),
        other => panic!("expected aspect call, got {other:?}"),
    }
}

#[test]
fn test_parse_aggregator_any() {
    let ast = parse("any(planet).Sign == Leo").unwrap();
    assert_eq!(
        ast,
        Expr::Aggregate {
            quantifier: Quantifier::Any,
            domain: DomainKind::Planets,
            filter: None,
            body: Box::new(Expr::Comparison {
                left: Box::new(Expr::Bound(PropKind::Sign)),
                op: CmpOp::Eq,
                right: Box::new(Expr::Sign(Sign::Leo)),
            }),
        }
    );
}

#[test]
fn test_parse_aggregator_with_where() {
    let ast = parse("any(planet WHERE Sign IN [Aries,Leo,Sagittarius]).House == 10").unwrap();
    match ast {
        Expr::Aggregate {
            quantifier: Quantifier::Any,
            domain: DomainKind::Planets,
            filter: Some(filter),
            body,
        } => {
            assert!(matches!(*filter, Expr::Comparison { op: CmpOp::In, .. }));
            match *body {
                Expr::Comparison { left, right, .. } => {
                    assert_eq!(*left, Expr::Bound(PropKind::House));
                    assert_eq!(*right, Expr::House(10));
                }
                other => panic!("expected comparison body, got {other:?}"),
            }
        }
        other => panic!("expected aggregate, got {other:?}"),
    }
}

#[test]
fn test_parse_all_plural_domain() {
    let ast = parse("all(planets).Retrograde == False").unwrap();
    match ast {
        Expr::Aggregate {
            quantifier: Quantifier::All,
            domain: DomainKind::Planets,
            ..
        } => {}
        other => panic!("expected all-aggregate, got {other:?}"),
    }
}

#[test]
fn test_parse_count() {
    let ast = parse("count(planet, Sign == Aquarius) >= 3").unwrap();
    match ast {
        Expr::Comparison { left, op: CmpOp::Ge, right } => {
            match *left {
                Expr::Count {
                    domain: DomainKind::Planets,
                    filter: Some(_),
                } => {}
                other => panic!("expected count, got {other:?}"),
            }
            assert_eq!(*right, Expr::number(3.0));
        }
        other => panic!("expected comparison, got {other:?}"),
    }

    assert!(matches!(
        parse("count(planet) >= 1").unwrap(),
        Expr::Comparison { .. }
    ));
}

#[test]
fn test_parse_dignity_literals() {
    let ast = parse("Sun.Dignity == Exaltation").unwrap();
    match ast {
        Expr::Comparison { right, .. } => {
            assert_eq!(*right, Expr::Literal(Literal::Dignity(Dignity::Exaltation)))
        }
        other => panic!("expected comparison, got {other:?}"),
    }
}

#[test]
fn test_parse_ruler_chain() {
    // Chained property access on a derived sign.
    let ast = parse("Sun.Sign.Ruler == Mars").unwrap();
    match ast {
        Expr::Comparison { left, .. } => match *left {
            Expr::Property {
                target,
                prop: PropKind::Ruler,
            } => assert!(matches!(
                *target,
                Expr::Property {
                    prop: PropKind::Sign,
                    ..
                }
            )),
            other => panic!("expected ruler access, got {other:?}"),
        },
        other => panic!("expected comparison, got {other:?}"),
    }
}

#[test]
fn test_unknown_function() {
    assert!(matches!(
        parse("Stellium(Aries)"),
        Err(Error::UnknownFunction { .. })
    ));
    assert!(matches!(
        parse("HasPattern(planet)"),
        Err(Error::UnknownFunction { .. })
    ));
}

#[test]
fn test_unknown_identifier() {
    assert!(matches!(
        parse("Vulcan.Sign == Aries"),
        Err(Error::UnknownIdentifier { .. })
    ));
}

#[test]
fn test_unknown_property() {
    assert!(matches!(
        parse("Sun.Color == Aries"),
        Err(Error::UnknownProperty { .. })
    ));
}

#[test]
fn test_unexpected_tokens() {
    assert!(matches!(parse("== Aries"), Err(Error::UnexpectedToken { .. })));
    assert!(matches!(
        parse("Sun.Sign == Aries extra"),
        Err(Error::UnexpectedToken { .. })
    ));
    assert!(matches!(
        parse("(Sun.Sign == Aries"),
        Err(Error::UnexpectedEof { .. })
    ));
    assert!(matches!(parse(""), Err(Error::UnexpectedEof { .. })));
}

#[test]
fn test_recursion_depth_bound() {
    let mut formula = String::new();
    for _ in 0..400 {
        formula.push('(');
    }
    formula.push_str("Sun.Retrograde");
    for _ in 0..400 {
        formula.push(')');
    }
    assert!(matches!(parse(&formula), Err(Error::TooDeep { .. })));
}

#[test]
fn test_formula_length_bound() {
    let formula = format!("Sun.Sign == Aries {}", " ".repeat(17 * 1024));
    assert!(matches!(parse(&formula), Err(Error::FormulaTooLong { .. })));
}

#[test]
fn test_bare_boolean_property() {
    // A bare boolean property is a valid formula on its own.
    let ast = parse("NOT Mercury.Retrograde").unwrap();
    assert_eq!(
        ast,
        Expr::Not {
            expr: prop(Planet::Mercury, PropKind::Retrograde),
        }
    );
}

#[test]
fn test_angle_references() {
    let ast = parse("Asc.Sign == Leo").unwrap();
    match ast {
        Expr::Comparison { left, .. } => {
            assert!(matches!(*left, Expr::Property { prop: PropKind::Sign, .. }))
        }
        other => panic!("expected comparison, got {other:?}"),
    }
}
