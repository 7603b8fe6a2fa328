//! Unit tests for the evaluator: end-to-end scenarios, short-circuit
//! observation, aggregator semantics

mod test_support;

use astrea_chart::{AspectKind, DignityConfig, Mode, Planet};
use astrea_formula::diagnostics::RuleCode;
use astrea_formula::{parse, Error, Evaluator};
use test_support::{aspect, chart, engine, reference_chart, ProbeChart};

#[test]
fn scenario_simple_conjunction() {
    // Sun at 15° Capricorn (house 8), Moon at 10° Gemini.
    let chart = reference_chart(Mode::Modern);
    let engine = engine(Mode::Modern);

    let outcome = engine
        .run("Sun.Sign == Capricorn AND Moon.Sign == Gemini", &chart)
        .unwrap();
    assert_eq!(outcome.value, Some(true));
    assert!(outcome.validation.issues.is_empty());

    let outcome = engine
        .run("Sun.Sign == Capricorn AND Moon.Sign == Cancer", &chart)
        .unwrap();
    assert_eq!(outcome.value, Some(false));
}

#[test]
fn scenario_rejected_before_evaluation() {
    let chart = reference_chart(Mode::Modern);
    let engine = engine(Mode::Modern);

    let outcome = engine.run("Sun.Retrograde == True", &chart).unwrap();
    assert_eq!(outcome.value, None);
    assert!(outcome.validation.has_code(RuleCode::RetroLuminary));

    // The convenience wrapper surfaces the rejection as an error.
    assert!(matches!(
        engine.evaluate("Sun.Retrograde == True", &chart),
        Err(Error::Rejected(_))
    ));
}

#[test]
fn scenario_aspect_orb() {
    let mut natal = chart(
        Mode::Modern,
        &[(Planet::Mars, 10.0, 1), (Planet::Saturn, 12.0, 1)],
    );
    natal
        .aspects
        .push(aspect(Planet::Mars, Planet::Saturn, AspectKind::Conj, 2.0));
    let engine = engine(Mode::Modern);

    assert_eq!(
        engine.evaluate("Asp(Mars, Saturn, Conj, orb<5)", &natal).unwrap(),
        true
    );
    assert_eq!(
        engine.evaluate("Asp(Mars, Saturn, Conj, orb<1)", &natal).unwrap(),
        false
    );
    // Default orb comes from configuration (8° for a conjunction).
    assert_eq!(engine.evaluate("Asp(Mars, Saturn, Conj)", &natal).unwrap(), true);
}

#[test]
fn aspect_is_symmetric() {
    let mut natal = chart(
        Mode::Modern,
        &[(Planet::Mars, 10.0, 1), (Planet::Saturn, 12.0, 1)],
    );
    natal
        .aspects
        .push(aspect(Planet::Mars, Planet::Saturn, AspectKind::Conj, 2.0));
    let engine = engine(Mode::Modern);

    assert_eq!(
        engine.evaluate("Asp(Mars, Saturn, Conj, orb<5)", &natal).unwrap(),
        engine.evaluate("Asp(Saturn, Mars, Conj, orb<5)", &natal).unwrap(),
    );
}

#[test]
fn aspect_list_fan_out() {
    let mut natal = chart(
        Mode::Modern,
        &[
            (Planet::Mars, 10.0, 1),
            (Planet::Saturn, 100.0, 4),
            (Planet::Pluto, 12.0, 1),
        ],
    );
    natal
        .aspects
        .push(aspect(Planet::Mars, Planet::Pluto, AspectKind::Conj, 2.0));
    let engine = engine(Mode::Modern);

    assert_eq!(
        engine
            .evaluate("Asp(Mars, [Saturn, Pluto], Conj)", &natal)
            .unwrap(),
        true
    );
    assert_eq!(
        engine.evaluate("Asp(Mars, [Saturn], Conj)", &natal).unwrap(),
        false
    );
}

#[test]
fn aspect_falls_back_to_longitudes_without_aspect_list() {
    // Producer shipped no aspect entries: the circular metric decides.
    let natal = chart(
        Mode::Modern,
        &[(Planet::Mars, 2.0, 1), (Planet::Saturn, 354.0, 12)],
    );
    let engine = engine(Mode::Modern);

    // min(|2-354|, 360-|2-354|) = 8, inside the canonical conjunction orb.
    assert_eq!(engine.evaluate("Asp(Mars, Saturn, Conj)", &natal).unwrap(), true);
    assert_eq!(
        engine.evaluate("Asp(Mars, Saturn, Conj, orb<5)", &natal).unwrap(),
        false
    );
}

#[test]
fn scenario_count() {
    // Sun, Mercury and Venus in Aquarius.
    let natal = chart(
        Mode::Modern,
        &[
            (Planet::Sun, 305.0, 10),
            (Planet::Mercury, 310.0, 10),
            (Planet::Venus, 325.0, 11),
            (Planet::Mars, 10.0, 1),
        ],
    );
    let engine = engine(Mode::Modern);

    assert_eq!(
        engine.evaluate("count(planet, Sign == Aquarius) >= 3", &natal).unwrap(),
        true
    );
    assert_eq!(
        engine.evaluate("count(planet, Sign == Aquarius) >= 4", &natal).unwrap(),
        false
    );
    assert_eq!(engine.evaluate("count(planet) == 4", &natal).unwrap(), true);
}

#[test]
fn scenario_all_retrograde() {
    let mut natal = reference_chart(Mode::Modern);
    let engine = engine(Mode::Modern);

    assert_eq!(
        engine.evaluate("all(planets).Retrograde == False", &natal).unwrap(),
        true
    );

    natal.planets.get_mut(&Planet::Mercury).unwrap().retrograde = true;
    assert_eq!(
        engine.evaluate("all(planets).Retrograde == False", &natal).unwrap(),
        false
    );
    assert_eq!(
        engine.evaluate("any(planet).Retrograde == True", &natal).unwrap(),
        true
    );
}

#[test]
fn any_aggregator_with_filter() {
    let natal = chart(
        Mode::Modern,
        &[
            (Planet::Sun, 130.0, 10),  // Leo in the 10th
            (Planet::Moon, 100.0, 9),  // Cancer in the 9th
            (Planet::Mars, 10.0, 1),   // Aries in the 1st
        ],
    );
    let engine = engine(Mode::Modern);

    assert_eq!(
        engine
            .evaluate("any(planet WHERE Sign IN [Aries,Leo,Sagittarius]).House == 10", &natal)
            .unwrap(),
        true
    );
    assert_eq!(
        engine
            .evaluate("any(planet WHERE Sign == Cancer).House == 10", &natal)
            .unwrap(),
        false
    );
}

#[test]
fn vacuous_all_is_true() {
    let natal = chart(Mode::Modern, &[(Planet::Sun, 285.0, 8)]);
    let engine = engine(Mode::Modern);

    // No planet passes the filter, so the universal holds vacuously.
    assert_eq!(
        engine
            .evaluate("all(planet WHERE Sign == Leo).Retrograde == True", &natal)
            .unwrap(),
        true
    );
    // And the existential over the same empty selection is false.
    assert_eq!(
        engine
            .evaluate("any(planet WHERE Sign == Leo).Retrograde == True", &natal)
            .unwrap(),
        false
    );
}

#[test]
fn scenario_dignity_mismatch_rejected() {
    let chart = reference_chart(Mode::Modern);
    let engine = engine(Mode::Modern);

    let outcome = engine
        .run("Sun.Sign == Taurus AND Sun.Dignity == Exaltation", &chart)
        .unwrap();
    assert_eq!(outcome.value, None);
    assert!(outcome.validation.has_code(RuleCode::DignitySignMismatch));
}

#[test]
fn and_short_circuits() {
    let probe = ProbeChart::new(reference_chart(Mode::Modern));
    let config = DignityConfig::modern();
    let evaluator = Evaluator::new(&probe, &config);

    // Sun is in Capricorn, so the left side is false and Moon must never
    // be probed.
    let ast = parse("Sun.Sign == Aries AND Moon.House == 7").unwrap();
    assert_eq!(evaluator.evaluate_bool(&ast).unwrap(), false);
    assert!(probe.probed(Planet::Sun));
    assert!(!probe.probed(Planet::Moon));
    assert_eq!(probe.probe_count(), 1);
}

#[test]
fn or_short_circuits() {
    let probe = ProbeChart::new(reference_chart(Mode::Modern));
    let config = DignityConfig::modern();
    let evaluator = Evaluator::new(&probe, &config);

    let ast = parse("Sun.Sign == Capricorn OR Moon.House == 7").unwrap();
    assert_eq!(evaluator.evaluate_bool(&ast).unwrap(), true);
    assert!(!probe.probed(Planet::Moon));
    assert_eq!(probe.probe_count(), 1);
}

#[test]
fn rhs_evaluates_when_lhs_does_not_decide() {
    let probe = ProbeChart::new(reference_chart(Mode::Modern));
    let config = DignityConfig::modern();
    let evaluator = Evaluator::new(&probe, &config);

    let ast = parse("Sun.Sign == Capricorn AND Moon.House == 7").unwrap();
    assert_eq!(evaluator.evaluate_bool(&ast).unwrap(), true);
    assert!(probe.probed(Planet::Sun));
    assert!(probe.probed(Planet::Moon));
}

#[test]
fn any_stops_at_first_hit() {
    let probe = ProbeChart::new(reference_chart(Mode::Modern));
    let config = DignityConfig::modern();
    let evaluator = Evaluator::new(&probe, &config);

    // Sun (first in the domain) is in Capricorn: one probe suffices.
    let ast = parse("any(planet).Sign == Capricorn").unwrap();
    assert_eq!(evaluator.evaluate_bool(&ast).unwrap(), true);
    assert_eq!(probe.probe_count(), 1);
}

#[test]
fn all_stops_at_first_miss() {
    let mut natal = reference_chart(Mode::Modern);
    natal.planets.get_mut(&Planet::Mercury).unwrap().retrograde = true;
    let probe = ProbeChart::new(natal);
    let config = DignityConfig::modern();
    let evaluator = Evaluator::new(&probe, &config);

    // Domain order is Sun, Moon, Mercury, ...: Mercury decides.
    let ast = parse("all(planets).Retrograde == False").unwrap();
    assert_eq!(evaluator.evaluate_bool(&ast).unwrap(), false);
    assert_eq!(probe.probe_count(), 3);
    assert!(!probe.probed(Planet::Venus));
}

#[test]
fn house_and_sign_domains() {
    let natal = chart(
        Mode::Modern,
        &[
            (Planet::Sun, 305.0, 10),
            (Planet::Mercury, 310.0, 10),
            (Planet::Venus, 335.0, 11),
        ],
    );
    let engine = engine(Mode::Modern);

    assert_eq!(
        engine.evaluate("any(house).PlanetsCount >= 2", &natal).unwrap(),
        true
    );
    assert_eq!(
        engine.evaluate("any(house).PlanetsCount >= 3", &natal).unwrap(),
        false
    );
    assert_eq!(
        engine
            .evaluate("count(sign, PlanetsCount >= 1) == 2", &natal)
            .unwrap(),
        true
    );
}

#[test]
fn aspects_domain() {
    let mut natal = reference_chart(Mode::Modern);
    natal
        .aspects
        .push(aspect(Planet::Mars, Planet::Saturn, AspectKind::Conj, 2.0));
    natal
        .aspects
        .push(aspect(Planet::Sun, Planet::Moon, AspectKind::Opp, 5.0));
    let engine = engine(Mode::Modern);

    assert_eq!(engine.evaluate("any(aspect).Kind == Opp", &natal).unwrap(), true);
    assert_eq!(
        engine.evaluate("any(aspect).Kind == Square", &natal).unwrap(),
        false
    );
    assert_eq!(engine.evaluate("count(aspect) == 2", &natal).unwrap(), true);
    assert_eq!(
        engine.evaluate("all(aspects).Orb <= 5", &natal).unwrap(),
        true
    );
}

#[test]
fn membership_and_rulers() {
    let natal = reference_chart(Mode::Modern);
    let engine = engine(Mode::Modern);

    assert_eq!(
        engine
            .evaluate("Sun.Sign IN [Capricorn, Aquarius]", &natal)
            .unwrap(),
        true
    );
    assert_eq!(
        engine.evaluate("Sun.Sign IN [Aries, Leo]", &natal).unwrap(),
        false
    );
    // Modern co-ruler set matches either member.
    assert_eq!(engine.evaluate("Scorpio.Ruler == Pluto", &natal).unwrap(), true);
    assert_eq!(engine.evaluate("Scorpio.Ruler == Mars", &natal).unwrap(), true);
    assert_eq!(
        engine
            .evaluate("Aquarius.Ruler IN [Saturn, Uranus, Neptune]", &natal)
            .unwrap(),
        true
    );
    // Reverse rulership: the signs a planet rules.
    assert_eq!(
        engine.evaluate("Mars.Ruler IN [Aries, Scorpio]", &natal).unwrap(),
        true
    );
}

#[test]
fn angle_properties() {
    // Cusp table starts at 0° Aries, so the MC cusp sits at 270° Capricorn.
    let natal = reference_chart(Mode::Modern);
    let engine = engine(Mode::Modern);

    assert_eq!(engine.evaluate("Asc.Sign == Aries", &natal).unwrap(), true);
    assert_eq!(engine.evaluate("MC.Sign == Capricorn", &natal).unwrap(), true);
}

#[test]
fn dignity_property() {
    let mut natal = chart(Mode::Modern, &[(Planet::Sun, 10.0, 1)]);
    natal.planets.get_mut(&Planet::Sun).unwrap().dignity = astrea_chart::Dignity::Exaltation;
    let engine = engine(Mode::Modern);

    assert_eq!(
        engine
            .evaluate("Sun.Sign == Aries AND Sun.Dignity == Exaltation", &natal)
            .unwrap(),
        true
    );
    // The true left side short-circuits; Saturn is absent from this chart
    // and must never be resolved.
    assert_eq!(
        engine
            .evaluate("Sun.Dignity == Exaltation OR Saturn.Dignity == Rulership", &natal)
            .unwrap(),
        true
    );
}

#[test]
fn non_boolean_top_level_is_an_error() {
    let natal = reference_chart(Mode::Modern);
    let engine = engine(Mode::Modern);

    assert!(matches!(
        engine.evaluate("count(planet)", &natal),
        Err(Error::NotABoolean)
    ));
}

#[test]
fn evaluation_is_deterministic() {
    let natal = reference_chart(Mode::Modern);
    let engine = engine(Mode::Modern);
    let formula = "any(planet WHERE Sign IN [Aries, Capricorn]).House == 8 AND NOT Mercury.Retrograde";

    let first = engine.evaluate(formula, &natal).unwrap();
    for _ in 0..10 {
        assert_eq!(engine.evaluate(formula, &natal).unwrap(), first);
    }
}
