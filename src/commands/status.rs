use crate::commands::{load_config, new_runtime, open_store};
use crate::error::Result;
use crate::services::{get_store_stats, StoreStats};

pub fn run(local: bool) {
    println!("📊 Fund Store Status\n");

    let config = load_config(local);
    let runtime = new_runtime();

    let result: Result<StoreStats> = runtime.block_on(async {
        let store = open_store(&config).await?;
        let stats = get_store_stats(&store.all_records());
        store.close().await;
        Ok(stats)
    });

    match result {
        Ok(stats) => show_status(&stats),
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn show_status(stats: &StoreStats) {
    if !stats.has_data() {
        println!("⚠️  No fund data found. Run 'ingest' or 'import' first.");
        return;
    }

    println!(
        "📈 Total: {} rows across {} funds\n",
        format_number(stats.total_rows),
        stats.funds.len()
    );
    println!("═══════════════════════════════════════════════════════════\n");

    for fund in &stats.funds {
        println!("🔹 {} ({})", fund.fund_code, fund.fund_name);
        println!(
            "   {:>8} records  ({} → {})",
            format_number(fund.record_count),
            fund.first_date,
            fund.last_date
        );
        println!("   Latest CumNAV: {:.4}", fund.last_cum_nav);
    }
}

fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
