use crate::error::Result;
use crate::hints;
use std::io::Read;

/// Print the hint for `stderr`, reading it from stdin when not given.
///
/// Prints nothing when no hint applies.
pub fn execute(manager: &str, operation: &str, stderr: Option<&str>) -> Result<()> {
    let text = match stderr {
        Some(text) => text.to_string(),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let hint = hints::format_install_error(manager, operation, &text);
    if !hint.is_empty() {
        println!("{}", hint);
    }
    Ok(())
}
