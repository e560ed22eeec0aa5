// src/descriptor/recipes.rs

//! Engine recipes (CASA task scripts) and the PBS submission template.
//!
//! The orchestrator never looks inside a rendered recipe; it only cares that
//! the job exits and leaves a log behind.

/// PBS batch script shared by every stage.
pub const SUBMISSION: &str = r#"#!/bin/bash
#PBS -N {{ stage }}_{{ partition }}
#PBS -l nodes={{ nodes }}:ppn={{ ppn }}
#PBS -l walltime={{ walltime }}
#PBS -j oe
#PBS -o {{ log_path }}
#PBS -q {{ queue }}

cd {{ work_dir }}
{% for line in env_setup %}{{ line }}
{% endfor %}{% if engine_procs > 1 %}{{ engine_dir }}/bin/mpicasa -n {{ engine_procs }} {% endif %}{{ engine_dir }}/bin/casa --nologger --nogui --nologfile -c {{ script }}
"#;

/// Split the input MS into the partition's calibrator and source sets.
pub const SPLIT: &str = r#"ms_name = '{{ ms_name }}'
spw = '{{ spw }}'
cal_name = '{{ calibrators }}'
src_name = '{{ source }}'

mstransform(vis=ms_name, spw=spw, outputvis='{{ cal_ms }}', field=cal_name, datacolumn='DATA')
mstransform(vis=ms_name, spw=spw, outputvis='{{ src_ms }}', field=src_name, datacolumn='DATA')
"#;

/// Flag the calibrators and solve for gain, delay, bandpass and flux scale.
pub const FLAG_CAL: &str = r#"ms_name = '{{ cal_ms }}'
amp_cal = '{{ amp_cal }}'
phase_cal = '{{ phase_cal }}'
refant = '{{ refant }}'

initial_ap = '{{ caltable_prefix }}.G0'
bp_file = '{{ caltable_prefix }}.B1'
delay_file = '{{ caltable_prefix }}.K1'
fluxtable = '{{ caltable_prefix }}.fluxscale'
gainsol = '{{ caltable_prefix }}.AP.G'
interp = ['nearest,nearestflag', 'nearest,nearestflag']

default(flagdata)
flagdata(vis=ms_name, mode='tfcrop', datacolumn='data', field=amp_cal + ',' + phase_cal,
         ntime='2min', timecutoff=5.0, freqcutoff=5.0, timefit='line', freqfit='poly',
         flagdimension='freqtime', extendflags=False, timedevscale=5.0, freqdevscale=5.0,
         extendpols=False, growaround=False, action='apply', flagbackup=True,
         overwrite=True, writeflags=True)

setjy(vis=ms_name, field=amp_cal)

default(gaincal)
gaincal(vis=ms_name, caltable=initial_ap, field=amp_cal, refant=refant, gaintype='G',
        solmode='L1R', calmode='ap', solint='int', minsnr=3, interp=interp, parang=True)

default(gaincal)
gaincal(vis=ms_name, caltable=delay_file, field=amp_cal, solint='120s', refant=refant,
        gaintype='K', gaintable=[initial_ap], parang=True)

default(bandpass)
bandpass(vis=ms_name, caltable=bp_file, field=amp_cal, solint='inf', refant=refant,
         solnorm=True, minsnr=2.0, fillgaps=8, parang=True,
         gaintable=[delay_file, initial_ap], interp=interp)

for field, append in [(amp_cal, False), (phase_cal, True)]:
    default(gaincal)
    gaincal(vis=ms_name, caltable=gainsol, solnorm=False, append=append, field=field,
            solint='120s', refant=refant, minsnr=2.0, solmode='L1R', gaintype='G',
            calmode='ap', gaintable=[delay_file, bp_file], interp=interp, parang=True)

fluxscale(vis=ms_name, caltable=gainsol, fluxtable=fluxtable, reference=amp_cal,
          transfer=phase_cal, incremental=False, display=True)
"#;

/// Flag the target source before calibration.
pub const FLAG_SRC: &str = r#"ms_name = '{{ src_ms }}'
src = '{{ source }}'

default(flagdata)
flagdata(vis=ms_name, mode='tfcrop', datacolumn='data', field=src, ntime='2min',
         timecutoff=5.0, freqcutoff=5.0, timefit='line', freqfit='poly',
         flagdimension='freqtime', extendflags=False, timedevscale=5.0, freqdevscale=5.0,
         extendpols=False, growaround=False, action='apply', flagbackup=True,
         overwrite=True, writeflags=True)
"#;

/// Apply the calibration tables to calibrators and source.
pub const APPLY_CAL: &str = r#"cal_ms = '{{ cal_ms }}'
src_ms = '{{ src_ms }}'
amp_cal = '{{ amp_cal }}'
phase_cal = '{{ phase_cal }}'
src = '{{ source }}'

bp_file = '{{ caltable_prefix }}.B1'
delay_file = '{{ caltable_prefix }}.K1'
fluxtable = '{{ caltable_prefix }}.fluxscale'
tables = [fluxtable, delay_file, bp_file]

default(applycal)
applycal(vis=cal_ms, field=amp_cal, gaintable=tables,
         gainfield=[amp_cal, amp_cal, amp_cal], interp=['nearest', ''],
         calwt=False, parang=True)

default(applycal)
applycal(vis=cal_ms, field=phase_cal, gaintable=tables,
         gainfield=[phase_cal, amp_cal, amp_cal], interp=['nearest', 'nearest'],
         calwt=False, parang=True)

default(applycal)
applycal(vis=src_ms, field=src, gaintable=tables,
         gainfield=[phase_cal, amp_cal, amp_cal], interp=['nearest', 'linear'],
         calwt=False, parang=True)
"#;

/// rflag pass over the corrected data of calibrators and source.
pub const FLAG_AFTER_CAL: &str = r#"cal_ms = '{{ cal_ms }}'
src_ms = '{{ src_ms }}'

common = dict(mode='rflag', datacolumn='corrected', timecutoff=5.0, freqcutoff=5.0,
              timefit='line', freqfit='poly', flagdimension='freqtime',
              extendflags=False, timedevscale=4.0, freqdevscale=4.0, extendpols=False,
              growaround=False, action='apply', flagbackup=True, overwrite=True,
              writeflags=True)

for ntime in ['2min', '1min']:
    default(flagdata)
    flagdata(vis=cal_ms, ntime=ntime, **common)

for ntime in ['2min', '1min']:
    for uvrange in ['0~1klambda', '1~3klambda', '3~5klambda', '>5klambda']:
        default(flagdata)
        flagdata(vis=src_ms, ntime=ntime, uvrange=uvrange, **common)
"#;
