//! Dashboard rendering: one Markdown section per cycle, four fixed-order
//! tables.
//!
//! Pure presentation over an [`AnalysisResult`]; the same renderer feeds the
//! cumulative `Dashboard.md` artifact and the terminal viewer.

use std::fmt::Write;

use crate::analysis::AnalysisResult;

/// Render the dashboard section for one cycle.
///
/// Section order and column titles are part of the artifact contract:
/// Eventos, Desconexiones, Consolidación, Porcentajes.
#[must_use]
pub fn render_cycle_section(analysis: &AnalysisResult, cycle_id: u64) -> String {
    format!(
        "\n# Análisis para Ciclo {cycle_id}\n{}",
        render_tables(analysis)
    )
}

/// The four analysis tables without the cycle header. Shared between the
/// dashboard artifact and the terminal viewer.
#[must_use]
pub fn render_tables(analysis: &AnalysisResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n## Análisis de Eventos\n");
    let _ = writeln!(out, "| Misión | Tipo de Dispositivo | Estado | Cantidad |");
    let _ = writeln!(out, "| --- | --- | --- | --- |");
    for (mission, device_type, counts) in analysis.events_analysis.pairs() {
        for (status, count) in counts.iter() {
            let _ = writeln!(out, "| {mission} | {device_type} | {status} | {count} |");
        }
    }

    let _ = writeln!(out, "\n## Gestión de Desconexiones\n");
    let _ = writeln!(
        out,
        "| Misión | Tipo de Dispositivo | Cantidad de Desconexiones |"
    );
    let _ = writeln!(out, "| --- | --- | --- |");
    for (mission, entries) in &analysis.disconnection_management {
        for entry in entries {
            let _ = writeln!(
                out,
                "| {mission} | {} | {} |",
                entry.device_type, entry.unknown_count
            );
        }
    }

    let _ = writeln!(out, "\n## Consolidación de Misiones\n");
    let _ = writeln!(out, "| Tipo de Dispositivo | Cantidad de Dispositivos |");
    let _ = writeln!(out, "| --- | --- |");
    for (device_type, count) in &analysis.consolidation {
        let _ = writeln!(out, "| {device_type} | {count} |");
    }

    let _ = writeln!(out, "\n## Porcentajes\n");
    let _ = writeln!(out, "| Misión | Tipo de Dispositivo | Estado | Porcentaje |");
    let _ = writeln!(out, "| --- | --- | --- | --- |");
    for (mission, devices) in &analysis.percentage_calculation {
        for (device_type, shares) in devices {
            for (status, share) in shares.iter() {
                let _ = writeln!(
                    out,
                    "| {mission} | {device_type} | {status} | {share:.2}% |"
                );
            }
        }
    }

    out
}
