use anyhow::{Context, Result};

use basalt_db::catalog::schema::SchemaBuilder;
use basalt_db::db_types::value::{CompOp, Value};
use basalt_db::index::hash::manager::{IndexHandle, IndexManager};
use basalt_db::iterators::record_scan::ScanPredicate;
use basalt_db::storage::disk::manager::FileManager;
use basalt_db::storage::record_file::{RecordFileHandle, RecordFileManager};
use basalt_db::storage::tuple;

// Small end-to-end walkthrough: a record file with a hash index over one
// of its columns. Run with RUST_LOG=debug to watch the page traffic.
fn main() -> Result<()> {
    env_logger::init();

    let dir = std::env::temp_dir().join(format!("basalt_demo_{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;

    let schema = SchemaBuilder::new()
        .add_varchar("name", 32)
        .add_int("age")
        .add_real("height")
        .build();

    let mut records = RecordFileManager::new(FileManager::new());
    let data_path = dir.join("people");
    records.create_file(&data_path)?;
    let mut file = RecordFileHandle::new();
    records.open_file(&data_path, &mut file)?;

    let people = [("ada", 36, 1.63f32), ("brin", 29, 1.80), ("cole", 52, 1.71)];
    let mut rids = Vec::new();
    for (name, age, height) in people {
        let data = tuple::encode_values(
            &schema,
            &[
                Value::Varchar(name.to_string()),
                Value::Int(age),
                Value::Real(height),
            ],
        )?;
        rids.push(file.insert_record(&schema, &data)?);
    }

    let mut indexes = IndexManager::new(FileManager::new());
    let index_name = dir.join("people_age").to_string_lossy().into_owned();
    indexes.create_file(&index_name, 4)?;
    let mut index = IndexHandle::new();
    indexes.open_file(&index_name, &mut index)?;

    let (_, age) = schema.attribute("age").context("age column missing")?;
    let age = age.clone();
    for (rid, (_, years, _)) in rids.iter().zip(people) {
        index.insert_entry(&age, &Value::Int(years), *rid)?;
    }

    // Probe the index, then fetch the matching row.
    let mut probe = index.scan(&age, Some(Value::Int(29)), Some(Value::Int(29)), true, true)?;
    while let Some((key, rid)) = probe.next_entry()? {
        let data = file.read_record(rid)?;
        println!("age {} -> {}", key, tuple::format_record(&schema, &data)?);
    }

    // Full scan with a predicate, no index involved.
    let predicate = ScanPredicate {
        attribute: "age".to_string(),
        op: CompOp::Gt,
        value: Value::Int(30),
    };
    let mut scan = file.scan(&schema, Some(predicate))?;
    while let Some((rid, data)) = scan.next_record()? {
        println!(
            "({}, {}) {}",
            rid.page,
            rid.slot,
            tuple::format_record(&schema, &data)?
        );
    }

    indexes.close_file(&mut index)?;
    records.close_file(&mut file)?;
    indexes.destroy_file(&index_name)?;
    records.destroy_file(&data_path)?;
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
