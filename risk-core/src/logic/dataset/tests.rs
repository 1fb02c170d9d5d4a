use super::nppes::{normalize_npi, process, HOSPITAL_FLAG_COLUMN};
use super::*;
use tempfile::tempdir;

const RAW: &str = "\
NPI,Entity Type Code,Provider Organization Name (Legal Business Name),Healthcare Provider Taxonomy Code_1,Healthcare Provider Taxonomy Code_2,Provider Enumeration Date,Last Update Date,NPI Deactivation Date
1000000001,1,,207Q00000X,,05/23/2005,07/08/2007,
1000000002,2,GENERAL HOSPITAL,282N00000X,,05/23/2005,01/15/2024,
1000000003,2.0,<UNAVAIL>,261QM0801X,283Q00000X,2010-03-01,not a date,
1000000004,2,REHAB CLINIC, ,,06/01/2012,,02/02/2020
";

fn raw_table() -> Table {
    Table::from_reader(RAW.as_bytes(), None).unwrap()
}

#[test]
fn test_read_csv_empty_fields_are_missing() {
    let table = raw_table();
    assert_eq!(table.len(), 4);
    assert_eq!(table.get(0, "Provider Organization Name (Legal Business Name)"), None);
    assert_eq!(table.get(1, "NPI"), Some("1000000002"));
    assert_eq!(table.get_f64(2, "Entity Type Code"), Some(2.0));
    assert!(!table.has_column("Nope"));
}

#[test]
fn test_read_csv_limit() {
    let table = Table::from_reader(RAW.as_bytes(), Some(2)).unwrap();
    assert_eq!(table.len(), 2);
}

#[test]
fn test_filter_organizations_accepts_float_codes() {
    let mut table = raw_table();
    let removed = filter_organizations(&mut table).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(table.len(), 3);
    assert!(table.rows().all(|r| r.get("NPI") != Some("1000000001")));
}

#[test]
fn test_filter_organizations_requires_column() {
    let mut table = Table::from_reader("NPI\n1\n".as_bytes(), None).unwrap();
    assert!(matches!(
        filter_organizations(&mut table),
        Err(DatasetError::MissingColumn(c)) if c == "Entity Type Code"
    ));
}

#[test]
fn test_hospital_taxonomy_any_column() {
    let mut table = raw_table();
    let count = flag_hospital_taxonomy(&mut table).unwrap();
    // 282N on the first code, 283Q on the second
    assert_eq!(count, 2);
    assert_eq!(table.get(1, HOSPITAL_FLAG_COLUMN), Some("True"));
    assert_eq!(table.get(2, HOSPITAL_FLAG_COLUMN), Some("True"));
    assert_eq!(table.get(3, HOSPITAL_FLAG_COLUMN), Some("False"));
}

#[test]
fn test_clean_markers_and_dates() {
    let mut table = raw_table();
    clean(&mut table);

    assert_eq!(table.get(2, "Provider Organization Name (Legal Business Name)"), None);
    assert_eq!(table.get(3, "Healthcare Provider Taxonomy Code_1"), None);
    assert_eq!(table.get(1, "Last Update Date"), Some("2024-01-15"));
    assert_eq!(table.get(2, "Provider Enumeration Date"), Some("2010-03-01"));
    assert_eq!(table.get(2, "Last Update Date"), None);
    assert_eq!(table.get(3, "NPI Deactivation Date"), Some("2020-02-02"));
}

#[test]
fn test_parse_date_formats() {
    let d = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    assert_eq!(parse_date("01/15/2024"), Some(d));
    assert_eq!(parse_date("2024-01-15"), Some(d));
    assert_eq!(parse_date("2024-01-15 00:00:00"), Some(d));
    assert_eq!(parse_date("13/45/2024"), None);
    assert_eq!(parse_date(""), None);
}

#[test]
fn test_process_and_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out").join(PROCESSED_FILE);

    let mut table = raw_table();
    let summary = process(&mut table).unwrap();
    assert_eq!(summary.rows_read, 4);
    assert_eq!(summary.organizations, 3);
    assert_eq!(summary.individuals_removed, 1);
    assert_eq!(summary.hospitals_by_taxonomy, 2);

    table.write_csv(&path).unwrap();
    let reread = Table::read_csv(&path, None).unwrap();
    assert_eq!(reread, table);
}

#[test]
fn test_read_missing_file() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        Table::read_csv(dir.path().join("absent.csv"), None),
        Err(DatasetError::NotFound(_))
    ));
}

#[test]
fn test_table_column_ops() {
    let mut table = Table::new(vec!["a".to_string(), "b".to_string()]);
    table.push_row(vec![Some("1".to_string()), Some("x".to_string())]);
    table.push_row(vec![None, Some("y".to_string())]);

    assert!(table.is_numeric_column("a"));
    assert!(!table.is_numeric_column("b"));
    assert_eq!(table.numeric_column("a").unwrap(), vec![Some(1.0), None]);

    table.add_numeric_column("c", vec![Some(0.5), Some(3.0)]).unwrap();
    assert_eq!(table.get(1, "c"), Some("3"));
    assert!(table.add_column("d", vec![None]).is_err());

    let picked = table.select(&["c".to_string(), "zzz".to_string(), "a".to_string()]);
    assert_eq!(picked.headers(), &["c".to_string(), "a".to_string()]);
    assert_eq!(picked.get(0, "a"), Some("1"));

    table.retain_rows(|r| r.is_present("a"));
    assert_eq!(table.len(), 1);
}

#[test]
fn test_normalize_npi() {
    assert_eq!(normalize_npi("1234567890"), "1234567890");
    assert_eq!(normalize_npi("1234567890.0"), "1234567890");
    assert_eq!(normalize_npi(" abc "), "abc");
}
