use super::*;
use tempfile::TempDir;

const SYNOPSIS_HEADER: &str = "MAL_ID,Name,Score,Genres,sypnopsis";
const METADATA_HEADER: &str = "MAL_ID,Name,Score,Genres,Type,Episodes,Members";

fn write_csv(dir: &Path, name: &str, header: &str, rows: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut content = String::from(header);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(&path, content).expect("should write test csv");
    path
}

fn standard_sources(dir: &Path) -> (PathBuf, PathBuf) {
    let synopsis = write_csv(
        dir,
        "synopsis.csv",
        SYNOPSIS_HEADER,
        &[
            "16498,Attack on Titan,8.53,\"Action, Drama\",\"Centuries ago,  mankind was slaughtered\nto near extinction by titans.\"",
            "1,Cowboy Bebop,8.78,\"Action, Sci-Fi\",\"In the year 2071, bounty hunters chase criminals across the solar system.\"",
            "5114,Fullmetal Alchemist: Brotherhood,9.19,\"Action, Adventure\",\"Two brothers search for the Philosopher's Stone.\"",
        ],
    );
    let metadata = write_csv(
        dir,
        "metadata.csv",
        METADATA_HEADER,
        &[
            "16498,Attack on Titan,8.53,\"Action, Drama\",TV,25,2589552",
            "1,Cowboy Bebop,8.78,\"Action, Sci-Fi\",TV,26,1251960",
            "5114,Fullmetal Alchemist: Brotherhood,9.19,\"Action, Adventure\",TV,64,2248456",
        ],
    );
    (synopsis, metadata)
}

#[test]
fn merge_produces_clean_records() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let (synopsis, metadata) = standard_sources(temp_dir.path());
    let output = temp_dir.path().join("processed.csv");

    let path = load_and_process(&synopsis, &metadata, &output).expect("should merge sources");
    assert_eq!(path, output);

    let records = read_processed(&output).expect("should read processed file");
    assert_eq!(records.len(), 3);

    for record in &records {
        assert!(!record.title.is_empty());
        assert!(!record.synopsis.is_empty());
        // Newlines and doubled spaces from the raw data are collapsed
        assert!(!record.synopsis.contains('\n'));
        assert!(!record.synopsis.contains("  "));
    }

    let aot = records
        .iter()
        .find(|r| r.mal_id == 16498)
        .expect("Attack on Titan should survive the merge");
    assert_eq!(aot.title, "Attack on Titan");
    assert_eq!(aot.genres, "Action, Drama");
    assert_eq!(aot.episodes, Some(25));
    assert_eq!(aot.members, Some(2_589_552));
}

#[test]
fn row_count_bounded_by_smaller_input() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let synopsis = write_csv(
        temp_dir.path(),
        "synopsis.csv",
        SYNOPSIS_HEADER,
        &[
            "1,Cowboy Bebop,8.78,Action,\"Bounty hunters in space.\"",
            "999,Unmatched Show,7.0,Action,\"This id is missing from the metadata.\"",
        ],
    );
    let metadata = write_csv(
        temp_dir.path(),
        "metadata.csv",
        METADATA_HEADER,
        &["1,Cowboy Bebop,8.78,Action,TV,26,1251960"],
    );
    let output = temp_dir.path().join("processed.csv");

    load_and_process(&synopsis, &metadata, &output).expect("should merge sources");
    let records = read_processed(&output).expect("should read processed file");

    // Inner join: rows without a metadata match are dropped
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].mal_id, 1);
}

#[test]
fn drops_placeholder_and_empty_synopses() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let synopsis = write_csv(
        temp_dir.path(),
        "synopsis.csv",
        SYNOPSIS_HEADER,
        &[
            "1,Cowboy Bebop,8.78,Action,\"Bounty hunters in space.\"",
            "2,Empty Show,7.0,Action,\"\"",
            "3,Placeholder Show,7.0,Action,\"No synopsis information has been added to this title.\"",
        ],
    );
    let metadata = write_csv(
        temp_dir.path(),
        "metadata.csv",
        METADATA_HEADER,
        &[
            "1,Cowboy Bebop,8.78,Action,TV,26,1251960",
            "2,Empty Show,7.0,Action,TV,12,1000",
            "3,Placeholder Show,7.0,Action,TV,12,1000",
        ],
    );
    let output = temp_dir.path().join("processed.csv");

    load_and_process(&synopsis, &metadata, &output).expect("should merge sources");
    let records = read_processed(&output).expect("should read processed file");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Cowboy Bebop");
}

#[test]
fn deduplicates_titles_case_insensitively() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let synopsis = write_csv(
        temp_dir.path(),
        "synopsis.csv",
        SYNOPSIS_HEADER,
        &[
            "1,Cowboy Bebop,8.78,Action,\"Bounty hunters in space.\"",
            "2,COWBOY BEBOP,8.78,Action,\"A duplicate entry with shouted casing.\"",
        ],
    );
    let metadata = write_csv(
        temp_dir.path(),
        "metadata.csv",
        METADATA_HEADER,
        &[
            "1,Cowboy Bebop,8.78,Action,TV,26,1251960",
            "2,COWBOY BEBOP,8.78,Action,TV,26,1251960",
        ],
    );
    let output = temp_dir.path().join("processed.csv");

    load_and_process(&synopsis, &metadata, &output).expect("should merge sources");
    let records = read_processed(&output).expect("should read processed file");

    assert_eq!(records.len(), 1);
    // First occurrence wins
    assert_eq!(records[0].mal_id, 1);
}

#[test]
fn missing_metadata_fails_without_partial_output() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let synopsis = write_csv(
        temp_dir.path(),
        "synopsis.csv",
        SYNOPSIS_HEADER,
        &["1,Cowboy Bebop,8.78,Action,\"Bounty hunters in space.\""],
    );
    let metadata = temp_dir.path().join("does_not_exist.csv");
    let output = temp_dir.path().join("processed.csv");

    let result = load_and_process(&synopsis, &metadata, &output);
    assert!(matches!(result, Err(AnirecError::Data(_))));
    assert!(!output.exists(), "No partial output file may be written");
}

#[test]
fn empty_join_fails() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let synopsis = write_csv(
        temp_dir.path(),
        "synopsis.csv",
        SYNOPSIS_HEADER,
        &["1,Cowboy Bebop,8.78,Action,\"Bounty hunters in space.\""],
    );
    let metadata = write_csv(
        temp_dir.path(),
        "metadata.csv",
        METADATA_HEADER,
        &["42,Some Other Show,7.0,Comedy,TV,12,1000"],
    );
    let output = temp_dir.path().join("processed.csv");

    let result = load_and_process(&synopsis, &metadata, &output);
    assert!(matches!(result, Err(AnirecError::Data(_))));
    assert!(!output.exists());
}

#[test]
fn accepts_corrected_synopsis_header() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let synopsis = write_csv(
        temp_dir.path(),
        "synopsis.csv",
        "MAL_ID,Name,Score,Genres,synopsis",
        &["1,Cowboy Bebop,8.78,Action,\"Bounty hunters in space.\""],
    );
    let metadata = write_csv(
        temp_dir.path(),
        "metadata.csv",
        METADATA_HEADER,
        &["1,Cowboy Bebop,8.78,Action,TV,26,1251960"],
    );
    let output = temp_dir.path().join("processed.csv");

    load_and_process(&synopsis, &metadata, &output).expect("should accept corrected header");
    let records = read_processed(&output).expect("should read processed file");
    assert_eq!(records.len(), 1);
}

#[test]
fn unknown_numeric_fields_become_none() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let synopsis = write_csv(
        temp_dir.path(),
        "synopsis.csv",
        SYNOPSIS_HEADER,
        &["1,Cowboy Bebop,Unknown,Action,\"Bounty hunters in space.\""],
    );
    let metadata = write_csv(
        temp_dir.path(),
        "metadata.csv",
        METADATA_HEADER,
        &["1,Cowboy Bebop,Unknown,Action,TV,Unknown,Unknown"],
    );
    let output = temp_dir.path().join("processed.csv");

    load_and_process(&synopsis, &metadata, &output).expect("should merge sources");
    let records = read_processed(&output).expect("should read processed file");

    assert_eq!(records[0].score, None);
    assert_eq!(records[0].episodes, None);
    assert_eq!(records[0].members, None);
}

#[test]
fn read_processed_missing_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let result = read_processed(&temp_dir.path().join("nope.csv"));
    assert!(matches!(result, Err(AnirecError::Data(_))));
}
