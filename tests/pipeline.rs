use std::collections::BTreeSet;
use std::path::PathBuf;

use pretty_assertions::assert_eq;

use guns_butter::data::chart::chart_series;
use guns_butter::data::export::{to_csv_bytes, CsvLayout};
use guns_butter::data::filter::filter_records;
use guns_butter::data::loader;
use guns_butter::directory::CountryDirectory;
use guns_butter::source::{fetch_countries, IndicatorSource};
use guns_butter::{
    run, Indicator, Metric, MissingCountry, MissingReason, PipelineRequest, Provenance, YearWindow,
};

const SNAPSHOT: &str = "\
country,name,region,indicator,year,value
AAA,Aland,North,military,2000,2.0
AAA,,,military,2002,3.0
AAA,,,education,2000,4.0
AAA,,,education,2001,4.5
AAA,,,education,2002,5.0
AAA,,,health,2000,1.0
AAA,,,health,2001,1.0
AAA,,,health,2002,1.0
BBB,Bland,North,military,2000,1.0
BBB,,,health,2000,2.0
CCC,Cland,South,military,2005,1.5
CCC,,,education,2005,0.0
CCC,,,health,2005,0.0
CCC,,,military,2006,1.5
CCC,,,education,2006,2.0
CCC,,,health,2006,1.0
WLD,World,Aggregates,military,2000,2.2
";

fn snapshot_path(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("snapshot.csv");
    std::fs::write(&path, SNAPSHOT).unwrap();
    path
}

fn request(countries: &[&str]) -> PipelineRequest {
    PipelineRequest {
        countries: countries.iter().map(|c| c.to_string()).collect(),
        metrics: Metric::ALL.to_vec(),
        window: YearWindow::new(1990, 2022),
        interpolate: true,
        exclude_synthesized: false,
    }
}

#[test]
fn snapshot_to_csv() {
    let dir = tempfile::tempdir().unwrap();
    let source = loader::load_file(&snapshot_path(&dir)).unwrap();
    let directory = CountryDirectory::new(source.list_countries().unwrap());
    assert!(!directory.contains("WLD"));
    assert_eq!(directory.codes_in_region("North"), vec!["AAA", "BBB"]);

    let req = request(&["AAA", "BBB", "CCC"]);
    let inputs = fetch_countries(&source, &req.countries);
    let output = run(&req, &inputs, |c| directory.display_name(c)).unwrap();

    assert_eq!(
        output.missing,
        vec![MissingCountry {
            code: "BBB".into(),
            reason: MissingReason::InsufficientCoverage(vec![Indicator::Education]),
        }]
    );

    // Zero butter in 2005 leaves a gap in CCC's ratio, not a zero.
    let ccc_ratio: Vec<(i32, f64)> = output
        .records
        .iter()
        .filter(|r| r.country == "Cland (CCC)" && r.metric == Metric::Ratio)
        .map(|r| (r.year, r.value))
        .collect();
    assert_eq!(ccc_ratio, vec![(2006, 0.5)]);

    let synthesized: Vec<(i32, Metric)> = output
        .records
        .iter()
        .filter(|r| r.source == Provenance::Synthesized)
        .map(|r| (r.year, r.metric))
        .collect();
    // Every metric of AAA's 2001 row shares the row's tag.
    assert_eq!(
        synthesized,
        vec![(2001, Metric::Military), (2001, Metric::Butter), (2001, Metric::Ratio)]
    );

    let csv = String::from_utf8(to_csv_bytes(&output.records, CsvLayout::WithSource).unwrap()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Year,Country,Metric,Value,Source"));
    assert_eq!(lines.count(), output.records.len());
    assert!(csv.contains("2001,Aland (AAA),Military,2.5,Synthesized"));
}

#[test]
fn reshape_is_a_bijection_on_defined_values() {
    let dir = tempfile::tempdir().unwrap();
    let source = loader::load_file(&snapshot_path(&dir)).unwrap();
    let req = request(&["AAA", "CCC"]);
    let inputs = fetch_countries(&source, &req.countries);
    let output = run(&req, &inputs, |c| c.to_string()).unwrap();

    let keys: BTreeSet<(String, Metric, i32)> = output
        .records
        .iter()
        .map(|r| (r.country.clone(), r.metric, r.year))
        .collect();
    assert_eq!(keys.len(), output.records.len());
    assert!(output.records.iter().all(|r| r.value.is_finite()));

    // AAA: 3 years × 3 metrics; CCC: military ×2, butter ×2, ratio ×1
    assert_eq!(output.records.len(), 9 + 5);

    let series = chart_series(&output.records);
    assert_eq!(series.len(), 6);
}

#[test]
fn window_and_observed_only() {
    let dir = tempfile::tempdir().unwrap();
    let source = loader::load_file(&snapshot_path(&dir)).unwrap();

    let mut req = request(&["AAA"]);
    req.window = YearWindow::new(2001, 2002);
    req.exclude_synthesized = true;
    let inputs = fetch_countries(&source, &req.countries);
    let output = run(&req, &inputs, |c| c.to_string()).unwrap();

    let years: BTreeSet<i32> = output.records.iter().map(|r| r.year).collect();
    assert_eq!(years, BTreeSet::from([2002]));
    assert_eq!(filter_records(&output.records, req.window), output.records);
}
