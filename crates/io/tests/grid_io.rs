use postfill_io::{read_grid, write_grid, IoError};
use postfill_recon::config::SheetRef;
use postfill_recon::grid::{CellValue, Grid};
use tempfile::tempdir;

fn output_grid() -> Grid {
    Grid::from_rows(vec![
        vec![CellValue::text("Serial No"), CellValue::text("Receiver Name"), CellValue::text("Receiver Pincode")],
        vec![CellValue::Empty, CellValue::text("Sample"), CellValue::Empty],
        vec![CellValue::number(1), CellValue::text("Ravi"), CellValue::Number(600004.0)],
        vec![CellValue::number(2), CellValue::text("Lakshmi, Devi"), CellValue::Number(560001.0)],
    ])
}

#[test]
fn xlsx_write_then_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("filled.xlsx");
    write_grid(&path, "Sheet1", &output_grid()).unwrap();

    let back = read_grid(&path, &SheetRef::Name("Sheet1".into())).unwrap();
    assert_eq!(back.height(), 4);
    assert_eq!(back.get(0, 2), &CellValue::text("Receiver Pincode"));
    assert_eq!(back.get(2, 0), &CellValue::Number(1.0));
    assert_eq!(back.get(3, 1), &CellValue::text("Lakshmi, Devi"));
    assert!(back.get(1, 0).is_blank());
}

#[test]
fn csv_write_then_read_is_text() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("filled.csv");
    write_grid(&path, "ignored", &output_grid()).unwrap();

    let back = read_grid(&path, &SheetRef::Index(3)).unwrap();
    assert_eq!(back.height(), 4);
    assert_eq!(back.get(2, 2), &CellValue::text("600004"));
    assert_eq!(back.get(3, 1), &CellValue::text("Lakshmi, Devi"));
}

#[test]
fn rewriting_identical_grid_gives_identical_file() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.xlsx");
    let b = dir.path().join("b.xlsx");
    write_grid(&a, "Sheet1", &output_grid()).unwrap();
    write_grid(&b, "Sheet1", &output_grid()).unwrap();
    assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
}

#[test]
fn failed_write_leaves_no_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("filled.xlsx");

    // Invalid worksheet name fails before anything touches the disk
    let err = write_grid(&path, "bad:name", &output_grid()).unwrap_err();
    assert!(matches!(err, IoError::Write { .. }));
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn failed_write_keeps_previous_output() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("filled.xlsx");
    write_grid(&path, "Sheet1", &output_grid()).unwrap();
    let before = std::fs::read(&path).unwrap();

    assert!(write_grid(&path, "bad:name", &Grid::new()).is_err());
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn unreadable_inputs() {
    let dir = tempdir().unwrap();

    let missing = dir.path().join("missing.xlsx");
    assert!(matches!(
        read_grid(&missing, &SheetRef::Index(0)),
        Err(IoError::Open { .. })
    ));

    let garbage = dir.path().join("garbage.xlsx");
    std::fs::write(&garbage, b"not a workbook").unwrap();
    assert!(matches!(
        read_grid(&garbage, &SheetRef::Index(0)),
        Err(IoError::Open { .. })
    ));

    let pdf = dir.path().join("report.pdf");
    std::fs::write(&pdf, b"%PDF").unwrap();
    assert!(matches!(
        read_grid(&pdf, &SheetRef::Index(0)),
        Err(IoError::UnsupportedFormat { .. })
    ));
}

#[test]
fn csv_manifest_with_blank_lines_keeps_every_record() {
    use postfill_recon::{generate_output, FillConfig, SourceGrids};

    let dir = tempdir().unwrap();
    let write = |name: &str, content: &str| {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        read_grid(&path, &SheetRef::Index(0)).unwrap()
    };

    // Title, booking date, an empty line, then the header on row 4
    let postal = write(
        "postal.csv",
        "TTD Publications - Postal Manifest\n\
         Booking Date: 2026-01-05\n\
         \n\
         S.No,Article No,Addressee,Address,City,Pincode,Mobile,Qty,Weight,Barcode\n\
         1,TR1,Ravi Kumar,\"12 Car St, Mylapore, Chennai\",Chennai,600001,9876543210,1,100,EZ1IN\n\
         \n\
         2,TR2,Sita Raman,\"4 North St, Madurai\",Madurai,600002,9876543211,2,200,EZ2IN\n",
    );
    let orders = write("orders.csv", "Booking No,Name,State,Address\nTR1,Ravi Kumar,Tamil Nadu,\"12 Car St, Chennai\"\n");
    let template = write(
        "template.csv",
        "Serial No,Barcode No,Receiver Name,Receiver Pincode\n1,EZ000000000IN,Sample,600001\n",
    );

    assert_eq!(postal.get(3, 0), &CellValue::text("S.No"));

    let config = FillConfig::from_toml("[dimensions]\npolicy = \"threshold\"\n").unwrap();
    let sources = SourceGrids {
        orders,
        postal,
        template,
        dimensions: None,
    };
    let out = generate_output(&config, &sources).unwrap();

    assert_eq!(out.summary.records, 2);
    assert_eq!(out.grid.get(2, 1), &CellValue::text("EZ1IN"));
    assert_eq!(out.grid.get(3, 2), &CellValue::text("Sita Raman"));
}

fn intake_template(path: &std::path::Path) {
    use rust_xlsxwriter::{Format, Workbook};

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let intake = workbook.add_worksheet().set_name("TTD Intake").unwrap();
    intake.set_column_width(1, 30).unwrap();
    intake.write_string_with_format(0, 0, "Serial No", &bold).unwrap();
    intake.write_string_with_format(0, 1, "Receiver Name", &bold).unwrap();
    intake.write_string_with_format(0, 2, "Receiver Pincode", &bold).unwrap();
    intake.write_string(1, 1, "Sample").unwrap();
    let notes = workbook.add_worksheet().set_name("Instructions").unwrap();
    notes.write_string(0, 0, "Data starts on row 3").unwrap();
    workbook.save(path).unwrap();
}

fn zip_entry(path: &std::path::Path, name: &str) -> Vec<u8> {
    use std::io::Read;
    let mut archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).unwrap();
    bytes
}

#[test]
fn filled_template_keeps_sheets_and_formatting() {
    use calamine::{open_workbook_auto, Reader};
    use postfill_io::write_filled_template;

    let dir = tempdir().unwrap();
    let template = dir.path().join("template.xlsx");
    let output = dir.path().join("filled.xlsx");
    intake_template(&template);

    let sheet = write_filled_template(&template, &SheetRef::Index(0), &output, &output_grid()).unwrap();
    assert_eq!(sheet, "TTD Intake");

    let workbook = open_workbook_auto(&output).unwrap();
    assert_eq!(workbook.sheet_names().to_vec(), vec!["TTD Intake".to_string(), "Instructions".to_string()]);

    let back = read_grid(&output, &SheetRef::Name("TTD Intake".into())).unwrap();
    assert_eq!(back.height(), 4);
    assert_eq!(back.get(2, 1), &CellValue::text("Ravi"));
    assert_eq!(back.get(3, 2), &CellValue::Number(560001.0));
    let notes = read_grid(&output, &SheetRef::Name("Instructions".into())).unwrap();
    assert_eq!(notes.get(0, 0), &CellValue::text("Data starts on row 3"));

    // Styles are copied as-is; the filled sheet keeps its column width and header style
    assert_eq!(zip_entry(&output, "xl/styles.xml"), zip_entry(&template, "xl/styles.xml"));
    let sheet_xml = String::from_utf8(zip_entry(&output, "xl/worksheets/sheet1.xml")).unwrap();
    assert!(sheet_xml.contains(r#"<col min="2" max="2""#));
    assert!(sheet_xml.contains(r#"<c r="A1" s="1" t="inlineStr">"#), "{sheet_xml}");
}

#[test]
fn filled_template_is_deterministic() {
    use postfill_io::write_filled_template;

    let dir = tempdir().unwrap();
    let template = dir.path().join("template.xlsx");
    intake_template(&template);
    let a = dir.path().join("a.xlsx");
    let b = dir.path().join("b.xlsx");
    write_filled_template(&template, &SheetRef::Index(0), &a, &output_grid()).unwrap();
    write_filled_template(&template, &SheetRef::Index(0), &b, &output_grid()).unwrap();
    assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
}

#[test]
fn filled_template_errors() {
    use postfill_io::write_filled_template;

    let dir = tempdir().unwrap();
    let template = dir.path().join("template.xlsx");
    intake_template(&template);
    let output = dir.path().join("filled.xlsx");

    let err = write_filled_template(&template, &SheetRef::Name("Manifest".into()), &output, &output_grid()).unwrap_err();
    match err {
        IoError::SheetNotFound { available, .. } => assert_eq!(available, "TTD Intake, Instructions"),
        other => panic!("unexpected error: {other}"),
    }

    let csv_template = dir.path().join("template.csv");
    std::fs::write(&csv_template, "Serial No\n").unwrap();
    assert!(matches!(
        write_filled_template(&csv_template, &SheetRef::Index(0), &output, &output_grid()),
        Err(IoError::UnsupportedFormat { .. })
    ));

    let missing_dir = dir.path().join("nope").join("filled.xlsx");
    assert!(matches!(
        write_filled_template(&template, &SheetRef::Index(0), &missing_dir, &output_grid()),
        Err(IoError::Write { .. })
    ));
    assert!(!output.exists());
}
