use std::error::Error;
use std::path::Path;

use stylefp::{StylefpConfig, VectorIndex, demo_page, query_similar, vectorize_and_store};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let config_path = "config/stylefp.yaml";
    let cfg = if Path::new(config_path).exists() {
        StylefpConfig::from_file(config_path)?
    } else {
        StylefpConfig::default()
    };

    let index = VectorIndex::open(cfg.index.to_index_config())?;
    let stored = vectorize_and_store(demo_page(), &cfg, &index)?;

    println!(
        "Stored page vector {} ({} dims, {} non-zero features)",
        stored.id,
        stored.vector.len(),
        stored.metadata["non_zero_count"]
    );

    let hits = query_similar(&index, &stored.vector, 3)?;
    println!("Nearest neighbours:");
    for hit in &hits {
        println!("  {:.6}  {}", hit.distance, hit.id);
    }

    Ok(())
}
