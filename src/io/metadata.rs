use crate::types::{BenthosError, BenthosResult, SceneMetadata, NUM_BANDS};
use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::path::Path;

/// WorldView image support data (ISD) document, `<isd>` root
#[derive(Debug, Deserialize)]
pub struct IsdDocument {
    #[serde(rename = "IMD")]
    pub imd: ImdBlock,
}

#[derive(Debug, Deserialize)]
pub struct ImdBlock {
    #[serde(rename = "NUMROWS")]
    pub num_rows: usize,
    #[serde(rename = "NUMCOLUMNS")]
    pub num_columns: usize,
    #[serde(rename = "BAND_C")]
    pub band_c: BandCalibration,
    #[serde(rename = "BAND_B")]
    pub band_b: BandCalibration,
    #[serde(rename = "BAND_G")]
    pub band_g: BandCalibration,
    #[serde(rename = "BAND_Y")]
    pub band_y: BandCalibration,
    #[serde(rename = "BAND_R")]
    pub band_r: BandCalibration,
    #[serde(rename = "BAND_RE")]
    pub band_re: BandCalibration,
    #[serde(rename = "BAND_N")]
    pub band_n: BandCalibration,
    #[serde(rename = "BAND_N2")]
    pub band_n2: BandCalibration,
    #[serde(rename = "IMAGE")]
    pub image: ImageBlock,
}

#[derive(Debug, Deserialize)]
pub struct BandCalibration {
    #[serde(rename = "ABSCALFACTOR")]
    pub abs_cal_factor: f64,
}

#[derive(Debug, Deserialize)]
pub struct ImageBlock {
    #[serde(rename = "FIRSTLINETIME")]
    pub first_line_time: String,
    #[serde(rename = "MEANSUNEL")]
    pub mean_sun_el: f64,
    #[serde(rename = "MEANSUNAZ")]
    pub mean_sun_az: f64,
    #[serde(rename = "MEANSATEL")]
    pub mean_sat_el: f64,
    #[serde(rename = "MEANSATAZ")]
    pub mean_sat_az: f64,
    #[serde(rename = "MEANOFFNADIRVIEWANGLE")]
    pub mean_off_nadir_view_angle: f64,
    #[serde(rename = "CLOUDCOVER")]
    pub cloud_cover: f64,
}

/// Parser for WorldView ISD metadata documents
pub struct MetadataParser;

impl MetadataParser {
    /// Parse the metadata document text into scene metadata. Missing
    /// required fields are fatal.
    pub fn parse(xml_content: &str) -> BenthosResult<SceneMetadata> {
        let doc = from_str::<IsdDocument>(xml_content)
            .map_err(|e| BenthosError::XmlParsing(format!("Failed to parse ISD XML: {}", e)))?;
        let imd = doc.imd;

        // Calibration factors in fixed band order: C, B, G, Y, R, RE, N, N2
        let abs_cal_factor: [f64; NUM_BANDS] = [
            imd.band_c.abs_cal_factor,
            imd.band_b.abs_cal_factor,
            imd.band_g.abs_cal_factor,
            imd.band_y.abs_cal_factor,
            imd.band_r.abs_cal_factor,
            imd.band_re.abs_cal_factor,
            imd.band_n.abs_cal_factor,
            imd.band_n2.abs_cal_factor,
        ];

        // e.g. "2017-12-22T16:48:10.923850Z"
        let acquisition = NaiveDateTime::parse_from_str(
            &imd.image.first_line_time,
            "%Y-%m-%dT%H:%M:%S%.fZ",
        )
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
        .map_err(|e| {
            BenthosError::Metadata(format!(
                "Invalid FIRSTLINETIME '{}': {}",
                imd.image.first_line_time, e
            ))
        })?;

        Ok(SceneMetadata {
            rows: imd.num_rows,
            cols: imd.num_columns,
            abs_cal_factor,
            acquisition,
            sun_elevation: imd.image.mean_sun_el,
            sun_azimuth: imd.image.mean_sun_az,
            sat_elevation: imd.image.mean_sat_el,
            sat_azimuth: imd.image.mean_sat_az,
            off_nadir: imd.image.mean_off_nadir_view_angle,
            cloud_cover: imd.image.cloud_cover,
        })
    }

    pub fn read_file<P: AsRef<Path>>(path: P) -> BenthosResult<SceneMetadata> {
        log::info!("reading metadata from {}", path.as_ref().display());
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }
}
