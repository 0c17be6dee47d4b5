use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;

#[derive(Args, Debug)]
pub struct ManArgs {
    /// Output directory (default: dist/share/man/man1)
    #[arg(long = "out-dir", default_value = "dist/share/man/man1")]
    pub out_dir: PathBuf,
}

pub fn cmd_man(args: ManArgs) -> Result<(), String> {
    let out_dir = crate::workspace_root().join(&args.out_dir);
    fs::create_dir_all(&out_dir).map_err(|e| format!("{}: {e}", out_dir.display()))?;

    let cmd = logbump::command();
    write_page(&out_dir, "logbump.1", cmd.clone())?;

    for sub in cmd.get_subcommands() {
        // `logbump-update.1`, `logbump-doctor.1`, ...
        let file = format!("logbump-{}.1", sub.get_name());
        write_page(&out_dir, &file, sub.clone())?;
    }
    Ok(())
}

fn write_page(dir: &Path, file: &str, cmd: clap::Command) -> Result<(), String> {
    let mut buffer: Vec<u8> = Vec::new();
    clap_mangen::Man::new(cmd)
        .render(&mut buffer)
        .map_err(|e| format!("render {file}: {e}"))?;

    let path = dir.join(file);
    fs::write(&path, buffer).map_err(|e| format!("{}: {e}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}
