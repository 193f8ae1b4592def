//! Rendering of the throwaway test script seeded into each environment.

use crate::core::specifier::import_targets;

/// File name of the synthesized script inside the environment root.
pub const TEST_SCRIPT_NAME: &str = "ghost_test.py";

/// Line printed by the synthesized script once its imports succeed.
pub const SUCCESS_MARKER: &str = "print('Script setup complete.')";

/// Render the test script for the requested package specifiers.
///
/// One `import` line per distinct distribution name, then a placeholder
/// success marker. Output is newline-terminated.
pub fn render_test_script<S: AsRef<str>>(packages: &[S]) -> String {
    let mut lines = vec![
        "# Test script for ghostenv".to_string(),
        "# You can edit this file to test your packages.".to_string(),
        String::new(),
    ];
    for target in import_targets(packages) {
        lines.push(format!("import {target}  # Test import"));
    }
    lines.push(String::new());
    lines.push("# Add your test code below!".to_string());
    lines.push(SUCCESS_MARKER.to_string());

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
