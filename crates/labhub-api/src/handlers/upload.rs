//! Upload route: the caller boundary in front of the validation and
//! conversion core.
//!
//! The boundary owns all string normalization: it composes the test-type
//! token from category and subcategory, joins brand and model into the
//! instrument token, uppercases everything, and decompresses the gzip
//! payload. The core below it only ever sees normalized tokens and a
//! staged file.

use std::io::Read;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::response::Html;
use flate2::read::GzDecoder;
use tracing::debug;

use labhub_core::error::AppError;
use labhub_core::types::ExperimentEnvelope;
use labhub_registry::{FileExtension, Instrument, TestType};

use crate::error::ApiError;
use crate::state::AppState;

/// Optional form fields forwarded to the converter.
const ALLOWED_OPTIONAL_FIELDS: &[&str] = &["data_format_model", "sep"];

/// Collected multipart form content.
#[derive(Debug, Default)]
struct UploadForm {
    test_type: Option<String>,
    test_type_subcategory: Option<String>,
    instrument: Option<String>,
    instrument_brand: Option<String>,
    options: Vec<(String, String)>,
    /// First attached file: (file name, raw bytes).
    file: Option<(String, Vec<u8>)>,
    /// Number of attached files beyond the first.
    extra_files: usize,
}

/// GET /api/upload_file — minimal manual-upload form.
pub async fn upload_form() -> Html<&'static str> {
    Html(
        "<!doctype html>\n\
         <title>Upload new File</title>\n\
         <h1>Upload new File</h1>\n\
         <form method=post enctype=multipart/form-data>\n\
           <input type=file name=files>\n\
           <input type=submit value=Upload>\n\
         </form>\n",
    )
}

/// POST /api/upload_file — validate the declared combination, stage the
/// decompressed payload, and run the matching converter.
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExperimentEnvelope>, ApiError> {
    let form = read_form(multipart).await?;

    let brand = form
        .instrument_brand
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("Please provide an instrument brand"))?;
    let instrument_model = form
        .instrument
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("Please provide an instrument"))?;
    let test_type_field = form
        .test_type
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::validation("Please provide a test type"))?;

    // XRD is the one category without a subcategory; everything else is
    // "CATEGORY-SUBCATEGORY".
    let test_type = if test_type_field.eq_ignore_ascii_case("XRD") {
        test_type_field.to_string()
    } else {
        let subcategory = form
            .test_type_subcategory
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::validation("Please provide a test type subcategory"))?;
        format!("{test_type_field}-{subcategory}")
    };
    let instrument = format!("{brand}-{instrument_model}");

    let (file_name, compressed) = form
        .file
        .ok_or_else(|| AppError::validation("No file attached"))?;
    if form.extra_files > 0 {
        debug!(
            extra = form.extra_files,
            "multiple files attached; only the first is converted"
        );
    }

    if !file_name.ends_with(".gz") {
        return Err(AppError::validation("Only gz files allowed").into());
    }

    // "sample.mpr.gz" → stem "sample", declared extension "MPR".
    let inner_name = file_name.trim_end_matches(".gz");
    let (stem, extension) = match inner_name.rsplit_once('.') {
        Some((stem, ext)) => (stem, ext.to_uppercase()),
        None => (inner_name, String::new()),
    };
    if stem.is_empty() {
        return Err(AppError::validation("File has no name").into());
    }

    let data = decompress(&compressed)?;
    if data.is_empty() {
        return Err(AppError::validation("File is empty").into());
    }
    if data.len() as u64 > state.config.storage.max_upload_size_bytes {
        return Err(AppError::validation("File is too large").into());
    }

    let test_type = test_type.to_uppercase();
    let instrument = instrument.to_uppercase();

    let converter_id = state
        .validator
        .validate(&extension, &test_type, &instrument)?;

    // The tokens were accepted, so re-parsing them is infallible unless
    // validator and tokens drift.
    let ctx = conversion_context(&extension, &test_type, &instrument, &form.options)?;

    let location = state.temp_store.stage(&extension, &data).await?;
    debug!(
        converter = %converter_id,
        location = %location.display(),
        "dispatching conversion"
    );

    let envelope = state
        .dispatch
        .get(converter_id)
        .convert(&location, &ctx)
        .await?;

    Ok(Json(envelope))
}

/// Drain the multipart stream into an [`UploadForm`].
async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "test_type" => form.test_type = Some(read_text(field, &name).await?),
            "test_type_subcategory" => {
                form.test_type_subcategory = Some(read_text(field, &name).await?)
            }
            "instrument" => form.instrument = Some(read_text(field, &name).await?),
            "instrument_brand" => form.instrument_brand = Some(read_text(field, &name).await?),
            "files" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Failed to read upload: {e}")))?;
                if form.file.is_none() {
                    form.file = Some((file_name, bytes.to_vec()));
                } else {
                    form.extra_files += 1;
                }
            }
            other if ALLOWED_OPTIONAL_FIELDS.contains(&other) => {
                let value = read_text(field, &name).await?;
                if !value.is_empty() {
                    form.options.push((name, value));
                }
            }
            other => {
                debug!(field = other, "ignoring unknown form field");
            }
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| AppError::validation(format!("Failed to read field '{name}': {e}")).into())
}

/// Decompress the gzip upload payload.
fn decompress(compressed: &[u8]) -> Result<Vec<u8>, ApiError> {
    let mut decoder = GzDecoder::new(compressed);
    let mut data = Vec::new();
    decoder
        .read_to_end(&mut data)
        .map_err(|e| AppError::validation(format!("File is not a valid gzip archive: {e}")))?;
    Ok(data)
}

/// Build the converter context from validated tokens and form options.
fn conversion_context(
    extension: &str,
    test_type: &str,
    instrument: &str,
    options: &[(String, String)],
) -> Result<labhub_convert::ConversionContext, ApiError> {
    let drift = || AppError::internal("validated token failed to parse");

    let mut ctx = labhub_convert::ConversionContext::new(
        Instrument::parse(instrument).ok_or_else(drift)?,
        TestType::parse(test_type).ok_or_else(drift)?,
        FileExtension::parse(extension).ok_or_else(drift)?,
    );
    for (key, value) in options {
        if key == "data_format_model" {
            ctx = ctx.with_model_override(value.clone());
        } else {
            ctx = ctx.with_option(key.clone(), value.clone());
        }
    }
    Ok(ctx)
}
