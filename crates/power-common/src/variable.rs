//! Known NASA POWER radiation parameters.
//!
//! The archive exposes many more parameters; this table covers the
//! surface radiative flux family the pipeline is built for. Requests for
//! ids outside the table are rejected before any network traffic.

/// Metadata for a POWER parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterInfo {
    /// Archive identifier, e.g. "ALLSKY_SFC_LW_DWN".
    pub id: &'static str,
    /// Physical units as reported by the archive.
    pub units: &'static str,
    /// Human-readable description.
    pub long_name: &'static str,
}

/// Surface radiation parameters served by the POWER daily archive.
pub const PARAMETERS: &[ParameterInfo] = &[
    ParameterInfo {
        id: "ALLSKY_SFC_LW_DWN",
        units: "W/m^2",
        long_name: "All-sky surface longwave downward irradiance",
    },
    ParameterInfo {
        id: "ALLSKY_SFC_SW_DWN",
        units: "W/m^2",
        long_name: "All-sky surface shortwave downward irradiance",
    },
    ParameterInfo {
        id: "CLRSKY_SFC_SW_DWN",
        units: "W/m^2",
        long_name: "Clear-sky surface shortwave downward irradiance",
    },
    ParameterInfo {
        id: "ALLSKY_SFC_SW_DNI",
        units: "W/m^2",
        long_name: "All-sky surface shortwave direct normal irradiance",
    },
    ParameterInfo {
        id: "ALLSKY_SFC_SW_DIFF",
        units: "W/m^2",
        long_name: "All-sky surface shortwave diffuse irradiance",
    },
    ParameterInfo {
        id: "ALLSKY_SFC_PAR_TOT",
        units: "W/m^2",
        long_name: "All-sky surface photosynthetically active radiation",
    },
];

/// Look up a parameter by its archive id.
pub fn lookup_parameter(id: &str) -> Option<&'static ParameterInfo> {
    PARAMETERS.iter().find(|p| p.id == id)
}
