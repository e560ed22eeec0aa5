// src/descriptor/template.rs

//! The single place where parameters are substituted into script text.
//!
//! Values are inserted verbatim: nothing is quoted, escaped or validated. A
//! field name containing a quote ends up as a broken line in the generated
//! engine script, and that is left for the engine to report.

use serde::Serialize;
use tera::{Context, Tera};

use crate::errors::Result;

/// Everything a recipe or the submission template may refer to.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptParams {
    pub stage: String,
    pub partition: String,
    pub spw: String,
    pub ms_name: String,
    /// `<partition>/cal.ms`
    pub cal_ms: String,
    /// `<partition>/src.ms`
    pub src_ms: String,
    /// `<partition>/caltables/cal`
    pub caltable_prefix: String,
    pub amp_cal: String,
    pub phase_cal: String,
    /// `<phase_cal>,<amp_cal>`
    pub calibrators: String,
    pub source: String,
    pub refant: String,
    pub work_dir: String,
    pub engine_dir: String,
    pub env_setup: Vec<String>,
    /// Processing script path as seen from `work_dir`.
    pub script: String,
    /// Declared log path as seen from `work_dir`.
    pub log_path: String,
    pub nodes: u32,
    pub ppn: u32,
    pub walltime: String,
    pub queue: String,
    pub engine_procs: u32,
}

/// Render `template` with `params`, autoescaping disabled.
pub fn render(template: &str, params: &ScriptParams) -> Result<String> {
    let context = Context::from_serialize(params)?;
    let text = Tera::one_off(template, &context, false)?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ScriptParams {
        ScriptParams {
            stage: "flag_src".into(),
            partition: "spw1".into(),
            spw: "0:574~1023".into(),
            ms_name: "rcs.ms".into(),
            cal_ms: "spw1/cal.ms".into(),
            src_ms: "spw1/src.ms".into(),
            caltable_prefix: "spw1/caltables/cal".into(),
            amp_cal: "3C286".into(),
            phase_cal: "1634+627".into(),
            calibrators: "1634+627,3C286".into(),
            source: "RX'CS".into(),
            refant: "C02".into(),
            work_dir: "/data".into(),
            engine_dir: "/opt/casa".into(),
            env_setup: vec![],
            script: "spw1/run_flag_src_spw1.py".into(),
            log_path: "spw1/flag_src_spw1.log".into(),
            nodes: 1,
            ppn: 6,
            walltime: "10:00:00".into(),
            queue: "workq".into(),
            engine_procs: 6,
        }
    }

    #[test]
    fn substitutes_without_escaping() {
        let out = render("src = '{{ source }}' & <{{ ms_name }}>", &params()).unwrap();
        assert_eq!(out, "src = 'RX'CS' & <rcs.ms>");
    }

    #[test]
    fn unknown_variable_is_an_error() {
        assert!(render("{{ nope }}", &params()).is_err());
    }
}
