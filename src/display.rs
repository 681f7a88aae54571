use crate::messages::format_timestamp;
use crate::state::DeviceStates;

const HEADERS: [&str; 3] = ["Device", "Last Update", "Location"];

/// Clears the terminal and prints a status line, plus a per-device table
/// unless privacy mode hides it. Rows are sorted by their rendered update
/// time, so devices without a location ("unknown") sort together at the end.
pub fn render(states: &DeviceStates, zone_count: usize, privacy: bool) {
    print!("\x1b[2J\x1b[H");
    println!(
        "Synchronizing {} devices and {} known locations",
        states.len(),
        zone_count
    );

    if privacy {
        return;
    }

    let mut rows: Vec<[String; 3]> = states
        .iter()
        .map(|(name, state)| {
            [
                name.clone(),
                format_timestamp(state.last_update),
                state.zone.clone(),
            ]
        })
        .collect();
    rows.sort_by(|a, b| a[1].cmp(&b[1]));

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    print_row(&HEADERS.map(str::to_string), &widths);
    print_row(&widths.map(|w| "-".repeat(w)), &widths);
    for row in &rows {
        print_row(row, &widths);
    }
}

fn print_row(cells: &[String; 3], widths: &[usize; 3]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    println!("{}", line.join("  "));
}
