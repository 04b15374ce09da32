use chrono::NaiveDate;

use epicast::app::pipeline::{GroupInput, run_pipeline};
use epicast::app::write_outputs;
use epicast::data::{SampleOptions, generate_sample};
use epicast::domain::{DateTable, ForecastConfig, RatioConfig, shift_days};
use epicast::forecast::ParamRow;
use epicast::io::{read_params_json, read_wide_csv};
use epicast::series::count_violations;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()
}

/// Cumulative counts whose daily increments keep growing: 0,0,0,10,20,35,55,80,...
fn accelerating(days: usize) -> Vec<f64> {
    let mut values = vec![0.0, 0.0, 0.0];
    let mut total = 0.0;
    let mut step = 10.0;
    while values.len() < days {
        total += step;
        values.push(total);
        if values.len() > 4 {
            step += 5.0;
        }
    }
    values
}

fn group(areas: &[(&str, Vec<f64>, Vec<f64>)]) -> GroupInput {
    let len = areas[0].1.len();
    let mut cases = DateTable::new(start(), len);
    let mut deaths = DateTable::new(start(), len);
    for (name, c, d) in areas {
        cases.insert(*name, c.clone()).unwrap();
        deaths.insert(*name, d.clone()).unwrap();
    }
    GroupInput {
        group: "world".to_string(),
        cases,
        deaths,
    }
}

#[test]
fn accelerating_area_gets_growing_forecast() {
    let cases = accelerating(50);
    assert_eq!(&cases[..8], &[0.0, 0.0, 0.0, 10.0, 20.0, 35.0, 55.0, 80.0]);
    let deaths: Vec<f64> = cases.iter().map(|c| (c / 50.0).floor()).collect();
    let input = group(&[("Acc", cases.clone(), deaths)]);
    let cutoff = shift_days(start(), 49);
    let cfg = ForecastConfig::new(cutoff);

    let run = run_pipeline(&[input], &cfg, &RatioConfig::default()).unwrap();
    let out = &run.groups[0].cases;
    let area = &out.areas["Acc"];

    assert!(!area.skipped());
    assert_eq!(area.forecast.start, shift_days(cutoff, 1));
    assert_eq!(area.forecast.len(), 30);
    assert!(area.forecast.daily.iter().all(|d| *d >= 0.0 && d.fract() == 0.0));
    assert_eq!(area.forecast.cumulative[0], cases[49] + area.forecast.daily[0]);
    assert!(area.forecast.cumulative[29] > cases[49]);

    let combined = out.tables.combined_cumulative.get("Acc").unwrap();
    assert_eq!(combined.len(), 80);
    assert_eq!(&combined[..50], &cases[..]);
    assert_eq!(count_violations(combined), 0);
}

#[test]
fn runs_are_bit_identical() {
    let sample = generate_sample(&SampleOptions {
        group: "demo".to_string(),
        seed: 11,
        areas: 6,
        days: 120,
        start: start(),
    })
    .unwrap();
    let cfg = ForecastConfig::new(shift_days(start(), 110));
    let a = run_pipeline(&[sample.input.clone()], &cfg, &RatioConfig::default()).unwrap();
    let b = run_pipeline(&[sample.input], &cfg, &RatioConfig::default()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn data_after_cutoff_is_ignored() {
    let cases = accelerating(60);
    let deaths = vec![0.0; 60];
    let mut later = cases.clone();
    for v in later.iter_mut().skip(45) {
        *v *= 3.0;
    }
    let cfg = ForecastConfig::new(shift_days(start(), 44));

    let a = run_pipeline(&[group(&[("A", cases, deaths.clone())])], &cfg, &RatioConfig::default())
        .unwrap();
    let b = run_pipeline(&[group(&[("A", later, deaths)])], &cfg, &RatioConfig::default())
        .unwrap();
    assert_eq!(
        a.groups[0].cases.tables.cumulative,
        b.groups[0].cases.tables.cumulative
    );
    assert_eq!(
        a.groups[0].deaths.tables.cumulative,
        b.groups[0].deaths.tables.cumulative
    );
}

#[test]
fn later_downward_correction_is_ignored() {
    let cases: Vec<f64> = (0..60).map(|i| 10.0 * (i * i) as f64).collect();
    let deaths: Vec<f64> = cases.iter().map(|c| (c / 100.0).floor()).collect();
    let mut corrected_cases = cases.clone();
    let mut corrected_deaths = deaths.clone();
    corrected_cases[50..].fill(cases[40]);
    corrected_deaths[50..].fill(deaths[40]);
    let cfg = ForecastConfig::new(shift_days(start(), 44));

    let a = run_pipeline(
        &[group(&[("A", cases.clone(), deaths.clone())])],
        &cfg,
        &RatioConfig::default(),
    )
    .unwrap();
    let b = run_pipeline(
        &[group(&[("A", corrected_cases, corrected_deaths)])],
        &cfg,
        &RatioConfig::default(),
    )
    .unwrap();

    let area = &b.groups[0].cases.areas["A"];
    assert_eq!(area.last_actual, cases[44]);
    assert_eq!(area.known(), &cases[..45]);
    assert_eq!(b.groups[0].deaths.areas["A"].known(), &deaths[..45]);
    assert_eq!(a.groups[0].cases.tables, b.groups[0].cases.tables);
    assert_eq!(a.groups[0].deaths.tables, b.groups[0].deaths.tables);
}

#[test]
fn short_history_forecast_stays_above_last_actual() {
    let cases = accelerating(40);
    assert_eq!(
        &cases[..11],
        &[0.0, 0.0, 0.0, 10.0, 20.0, 35.0, 55.0, 80.0, 110.0, 145.0, 185.0]
    );
    let cutoff = shift_days(start(), 10);

    for min_obs in [15, 5] {
        let input = group(&[("Acc", cases.clone(), vec![0.0; 40])]);
        let mut cfg = ForecastConfig::new(cutoff);
        cfg.min_obs = min_obs;
        let run = run_pipeline(&[input], &cfg, &RatioConfig::default()).unwrap();
        let area = &run.groups[0].cases.areas["Acc"];

        assert_eq!(area.skipped(), min_obs == 15, "min_obs {min_obs}");
        assert_eq!(area.last_actual, 185.0);
        let forecast = &area.forecast.cumulative;
        assert!(forecast.iter().all(|v| *v >= 185.0), "min_obs {min_obs}: {forecast:?}");
        assert!(forecast.windows(2).all(|w| w[1] >= w[0]), "min_obs {min_obs}");
    }
}

#[test]
fn degenerate_areas_stay_in_every_table() {
    let mut short = vec![0.0; 40];
    short[38] = 2.0;
    short[39] = 3.0;
    let input = group(&[
        ("Acc", accelerating(40), vec![0.0; 40]),
        ("Empty", vec![0.0; 40], vec![0.0; 40]),
        ("Short", short, vec![0.0; 40]),
    ]);
    let cfg = ForecastConfig::new(shift_days(start(), 39));
    let run = run_pipeline(&[input], &cfg, &RatioConfig::default()).unwrap();
    let cases = &run.groups[0].cases;

    for name in ["Empty", "Short"] {
        assert!(cases.areas[name].skipped(), "{name}");
        assert_eq!(cases.tables.daily.get(name).unwrap(), &[0.0; 30]);
        assert!(matches!(cases.tables.params[name], ParamRow::Logistic { fit: None }));
    }
    assert_eq!(cases.tables.cumulative.get("Short").unwrap(), &[3.0; 30]);
    assert_eq!(cases.tables.combined_daily.columns.len(), 3);
    assert_eq!(run.groups[0].deaths.tables.daily.columns.len(), 3);
}

#[test]
fn flat_driver_window_uses_fallback_ratio() {
    // Cases stop growing 50 days before the cutoff, so the lagged window total is 0.
    let mut cases = accelerating(20);
    cases.extend(std::iter::repeat_n(cases[19], 50));
    let deaths: Vec<f64> = (0..70).map(|i| (i / 3) as f64).collect();
    let input = group(&[("Flat", cases, deaths)]);
    let cfg = ForecastConfig::new(shift_days(start(), 69));
    let run = run_pipeline(&[input], &cfg, &RatioConfig::default()).unwrap();

    let deaths_out = &run.groups[0].deaths;
    let est = deaths_out.areas["Flat"].estimate;
    assert!(est.fallback_used);
    assert_eq!(est.ratio, 0.01);
    assert_eq!(est.driver_total, 0.0);
}

#[test]
fn repaired_dips_reach_the_combined_tables() {
    let mut cases = accelerating(50);
    cases[30] = cases[29] - 40.0;
    cases[31] = f64::NAN;
    let input = group(&[("Dip", cases, vec![0.0; 50])]);
    let cfg = ForecastConfig::new(shift_days(start(), 49));
    let run = run_pipeline(&[input], &cfg, &RatioConfig::default()).unwrap();

    let area = &run.groups[0].cases.areas["Dip"];
    assert_eq!(area.repair.repaired, 2);
    let combined = run.groups[0].cases.tables.combined_cumulative.get("Dip").unwrap();
    assert!(combined.iter().all(|v| v.is_finite()));
    assert_eq!(count_violations(combined), 0);
}

#[test]
fn outputs_round_trip_through_files() {
    let sample = generate_sample(&SampleOptions {
        group: "demo".to_string(),
        seed: 5,
        areas: 3,
        days: 90,
        start: start(),
    })
    .unwrap();
    let cfg = ForecastConfig::new(shift_days(start(), 89));
    let run = run_pipeline(&[sample.input], &cfg, &RatioConfig::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    write_outputs(dir.path(), &run).unwrap();

    let cum = read_wide_csv(&dir.path().join("demo_cases_cumulative.csv")).unwrap();
    assert_eq!(cum, run.groups[0].cases.tables.cumulative);
    let deaths = read_wide_csv(&dir.path().join("demo_deaths_combined_cumulative.csv")).unwrap();
    assert_eq!(deaths.len, 120);
    assert!(dir.path().join("demo_deaths_params.csv").exists());

    let manifest = read_params_json(&dir.path().join("run.json")).unwrap();
    assert_eq!(manifest.cutoff, cfg.cutoff);
    assert_eq!(manifest.models.len(), 2);
    let fitted = &run.groups[0].cases.tables.params;
    assert!(manifest.models[0].params.keys().eq(fitted.keys()));
    for row in manifest.models[1].params.values() {
        assert!(matches!(row, ParamRow::Ratio { .. }));
    }
}
