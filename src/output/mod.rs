use crate::pipeline::PipelineResults;
use crate::error::AppResult;
use std::path::Path;
use std::fs::File;
use log::info;

pub fn save_results<P: AsRef<Path>>(results: &PipelineResults, output_dir: P) -> AppResult<()> {
    let output_path = output_dir.as_ref();

    // Full output mapping, including per-stream errors
    save_results_json(results, &output_path.join("results.json"))?;

    // Long-format forecast values
    save_forecast_data(results, &output_path.join("forecasts.csv"))?;

    // Bed and staff projections
    save_resource_data(results, &output_path.join("resources.csv"))?;

    generate_report(results, output_path)?;

    info!("All results saved to {:?}", output_path);
    Ok(())
}

fn save_results_json<P: AsRef<Path>>(results: &PipelineResults, path: P) -> AppResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, results)?;
    Ok(())
}

fn save_forecast_data<P: AsRef<Path>>(results: &PipelineResults, path: P) -> AppResult<()> {
    let mut writer = csv::Writer::from_path(path)?;

    writer.write_record(["STREAM", "DATE", "VALUE"])?;

    for (stream, payload) in results.forecasts() {
        let forecast = &payload.forecast;
        for (date, value) in forecast.future_dates.iter().zip(&forecast.predicted_values) {
            writer.write_record(&[
                stream.clone(),
                date.to_string(),
                value.to_string(),
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}

fn save_resource_data<P: AsRef<Path>>(results: &PipelineResults, path: P) -> AppResult<()> {
    let Some(payload) = results.resources.ready() else {
        return Ok(());
    };
    let projection = &payload.projection;

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["DATE", "BEDS_NEEDED", "STAFF_NEEDED"])?;

    for ((date, beds), staff) in projection.dates.iter()
        .zip(&projection.beds_needed)
        .zip(&projection.staff_needed)
    {
        writer.write_record(&[date.to_string(), beds.to_string(), staff.to_string()])?;
    }

    writer.flush()?;
    Ok(())
}

/// Human-readable run summary next to the machine outputs.
pub fn generate_report<P: AsRef<Path>>(results: &PipelineResults, output_dir: P) -> AppResult<()> {
    let report_path = output_dir.as_ref().join("forecast_report.md");

    let los_line = match results.los.as_result() {
        Ok(los) => format!("{:.2} days (from {} patients; features: {})",
            los.avg, los.patients, los.features.join(", ")),
        Err(e) => format!("unavailable: {}", e),
    };

    let resources_lines = match results.resources.as_result() {
        Ok(payload) => {
            let p = &payload.projection;
            format!(
                "- Staff per bed ratio: {:.3}\n- Beds needed (first / last day): {} / {}\n- Staff needed (first / last day): {} / {}",
                p.staff_ratio,
                p.beds_needed.first().copied().unwrap_or(0.0),
                p.beds_needed.last().copied().unwrap_or(0.0),
                p.staff_needed.first().copied().unwrap_or(0.0),
                p.staff_needed.last().copied().unwrap_or(0.0),
            )
        },
        Err(e) => format!("- Unavailable: {}", e),
    };

    let mut stream_rows = String::new();
    for (stream, payload) in results.forecasts() {
        let f = &payload.forecast;
        stream_rows.push_str(&format!(
            "| {} | {} | {:.2} | {:.2} |\n",
            stream,
            f.len(),
            f.predicted_values.first().copied().unwrap_or(0.0),
            f.predicted_values.last().copied().unwrap_or(0.0),
        ));
    }

    let failures = results.failures();
    let failure_rows = if failures.is_empty() {
        "None\n".to_string()
    } else {
        failures.iter()
            .map(|(stream, error)| format!("- **{}**: {}\n", stream, error))
            .collect()
    };

    let report_content = format!(
        r#"# Hospital Forecast Report

## Length of Stay
- Average LOS: {}

## Resource Needs
{}

## Forecast Streams
| Stream | Days | First value | Last value |
|--------|------|-------------|------------|
{}
## Failed Streams
{}
## Files Generated
- `results.json`: Full result mapping, including per-stream errors and chart data
- `forecasts.csv`: Forecast values for every successful stream
- `resources.csv`: Daily bed and staff needs
"#,
        los_line,
        resources_lines,
        stream_rows,
        failure_rows,
    );

    std::fs::write(report_path, report_content)?;
    Ok(())
}
