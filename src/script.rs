//! Cleanup script generation: `cleanup.sh` and `cleanup.ps1`, written
//! side-by-side, both defaulting to a dry-run echo and requiring an
//! explicit `EXECUTE=1` environment variable to actually delete.

use crate::error::{CerebroError, Result};
use crate::model::DeletePlan;
use std::path::{Path, PathBuf};

fn bash_quote(path: &str) -> String {
    path.replace('\'', r#"'"'"'"#)
}

fn powershell_quote(path: &str) -> String {
    path.replace('\'', "''")
}

fn bash_script(paths: &[String], scan_id: &str) -> String {
    let mut out = String::new();
    out.push_str("#!/usr/bin/env bash\n");
    out.push_str("set -euo pipefail\n\n");
    out.push_str(&format!("# cerebro cleanup script (scan_id={scan_id})\n"));
    out.push_str("# Safe default: DRY RUN (echo). To execute, run: EXECUTE=1 ./cleanup.sh\n");
    out.push_str("EXECUTE=\"${EXECUTE:-0}\"\n\n");
    out.push_str("rm_file() {\n");
    out.push_str("  local p=\"$1\"\n");
    out.push_str("  if [[ \"${EXECUTE}\" == \"1\" ]]; then\n");
    out.push_str("    rm -f -- \"$p\"\n");
    out.push_str("  else\n");
    out.push_str("    echo \"[DRY] rm -f -- $p\"\n");
    out.push_str("  fi\n");
    out.push_str("}\n\n");
    for path in paths {
        out.push_str(&format!("rm_file '{}'\n", bash_quote(path)));
    }
    out
}

fn powershell_script(paths: &[String], scan_id: &str) -> String {
    let mut out = String::new();
    out.push_str("# cerebro cleanup script\n");
    out.push_str(&format!("# scan_id: {scan_id}\n"));
    out.push_str("# Safe default: DRY RUN (Write-Host). To execute: $env:EXECUTE=1; .\\cleanup.ps1\n");
    out.push_str("$Execute = $env:EXECUTE\n");
    out.push_str("if (-not $Execute) { $Execute = '0' }\n\n");
    out.push_str("function Remove-FileSafe($p) {\n");
    out.push_str("  if ($Execute -eq '1') {\n");
    out.push_str("    Remove-Item -LiteralPath $p -Force -ErrorAction Continue\n");
    out.push_str("  } else {\n");
    out.push_str("    Write-Host \"[DRY] Remove-Item -LiteralPath $p -Force\"\n");
    out.push_str("  }\n");
    out.push_str("}\n\n");
    for path in paths {
        out.push_str(&format!("Remove-FileSafe '{}'\n", powershell_quote(path)));
    }
    out
}

/// Write `cleanup.sh` and `cleanup.ps1` into `out_dir`, covering every
/// delete candidate in `plan` (survivors are never included).
pub fn write_cleanup_scripts(out_dir: &Path, plan: &DeletePlan, scan_id: &str) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(out_dir).map_err(|source| CerebroError::ReportWrite {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let paths: Vec<String> = plan.delete_candidates().map(|i| i.path.display().to_string()).collect();

    let sh_path = out_dir.join("cleanup.sh");
    let ps_path = out_dir.join("cleanup.ps1");

    std::fs::write(&sh_path, bash_script(&paths, scan_id)).map_err(|source| CerebroError::ReportWrite {
        path: sh_path.clone(),
        source,
    })?;
    std::fs::write(&ps_path, powershell_script(&paths, scan_id)).map_err(|source| CerebroError::ReportWrite {
        path: ps_path.clone(),
        source,
    })?;

    Ok((sh_path, ps_path))
}
