// src/fetch/urls.rs

use url::Url;

use crate::{
    error::{CensusError, Result},
    source::{Credential, Dataset, Source},
};

fn parse(raw: String) -> Result<Url> {
    Url::parse(&raw).map_err(|source| CensusError::InvalidUrl { url: raw, source })
}

/// Field listing page for one dataset and year.
pub fn catalog_url(base: &str, year: u16, dataset: Dataset) -> Result<Url> {
    parse(format!("{}/{}{}/variables.html", base, year, dataset.path()))
}

/// Data request for `NAME` plus `codes`, every region of the source's geography.
pub fn data_url(
    base: &str,
    year: u16,
    source: Source,
    codes: &[String],
    credential: &Credential,
) -> Result<Url> {
    let mut raw = format!(
        "{}/{}{}?get=NAME,{}&{}",
        base,
        year,
        source.dataset.path(),
        codes.join(","),
        source.geography.filter()
    );
    if !credential.is_empty() {
        raw.push_str("&key=");
        raw.push_str(credential.expose());
    }
    parse(raw)
}
