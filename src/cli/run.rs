use super::ui;
use crate::pipeline::{Pipeline, RunReport};
use anyhow::Result;
use comfy_table::{Cell, CellAlignment};

impl RunReport {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Field"), ui::header_cell("Value")]);

        let rate_note = if self.used_fallback_rate {
            ui::style_text("fallback", ui::StyleType::Warning)
        } else {
            ui::style_text("live", ui::StyleType::Good)
        };
        let insert_status = match &self.load.insert_error {
            Some(e) => ui::style_text(&format!("0 (rolled back: {e})"), ui::StyleType::Error),
            None => ui::style_text(
                &self.load.rows_inserted.to_string(),
                ui::StyleType::Good,
            ),
        };

        let record = &self.record;
        let home_label = format!("{} rate", self.home_currency);
        let rows = [
            ("Exchange rate", format!("{} ({rate_note})", self.exchange_rate)),
            ("Index updated", record.time_updated.clone()),
            ("USD rate", format!("{:.2}", record.bpi_usd_rate_float)),
            ("GBP rate", format!("{:.2}", record.bpi_gbp_rate_float)),
            ("EUR rate", format!("{:.2}", record.bpi_eur_rate_float)),
            (home_label.as_str(), format!("{:.2}", record.bpi_idr_rate_float)),
            ("Run timestamp", record.last_update.clone()),
            ("Rows inserted", insert_status),
            ("Rows in table", self.load.loaded.len().to_string()),
        ];
        for (label, value) in rows {
            table.add_row(vec![
                Cell::new(label),
                Cell::new(value).set_alignment(CellAlignment::Right),
            ]);
        }

        let mut output = format!(
            "{}\n\n",
            ui::style_text("Pipeline run", ui::StyleType::Title)
        );
        output.push_str(&table.to_string());
        output
    }
}

pub async fn run(pipeline: &Pipeline) -> Result<()> {
    let pb = ui::new_spinner("Running pipeline...");
    let result = pipeline.run().await;
    pb.finish_and_clear();
    let report = result?;

    println!("{}", report.display_as_table());
    println!(
        "\n{}\n{}",
        ui::style_text("All loaded data:", ui::StyleType::Label),
        ui::render_table(&report.load.loaded)
    );
    Ok(())
}
