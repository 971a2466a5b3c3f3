use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/events.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "order,customer,vendor,items,subtotal,delivery_fee,total,commission,status,settlement,courier",
        ))
        // One cash order for the first customer
        .stdout(predicate::str::contains("1,224620000001,1,1x1;2x2,39000,"))
        // The second customer never reached checkout
        .stdout(predicate::str::contains("224620000002").not());

    Ok(())
}

#[test]
fn test_cli_missing_input_fails() {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/does_not_exist.csv");

    cmd.assert().failure();
}

#[test]
fn test_cli_empty_stream_prints_header_only() -> Result<(), Box<dyn std::error::Error>> {
    let csv = tempfile::NamedTempFile::new()?;
    std::fs::write(csv.path(), "identity,kind,payload\n")?;

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg(csv.path());

    cmd.assert().success().stdout(predicate::str::diff(
        "order,customer,vendor,items,subtotal,delivery_fee,total,commission,status,settlement,courier\n",
    ));

    Ok(())
}
