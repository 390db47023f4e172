//! School registry record types
//!
//! Field names follow the registry's column names so rows decode without
//! renaming; doc comments give the English meaning.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Parse a string made of exactly `len` ASCII digits
fn parse_fixed_digits(text: &str, len: usize) -> Option<u32> {
    let text = text.trim();
    if text.len() != len || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// National 8-digit establishment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cue(pub u32);

impl Cue {
    pub const DIGITS: usize = 8;

    /// Parse from text holding exactly eight ASCII digits
    pub fn parse(text: &str) -> Option<Self> {
        parse_fixed_digits(text, Self::DIGITS).map(Cue)
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08}", self.0)
    }
}

/// 6-digit identifier of a physical site, possibly shared by several schools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Predio(pub u32);

impl Predio {
    pub const DIGITS: usize = 6;

    /// Parse from text holding exactly six ASCII digits
    pub fn parse(text: &str) -> Option<Self> {
        parse_fixed_digits(text, Self::DIGITS).map(Predio)
    }
}

impl fmt::Display for Predio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

/// Contact person for a school
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub cargo: Option<String>,
    pub telefono: Option<String>,
    pub correo: Option<String>,
}

impl Contact {
    pub fn full_name(&self) -> String {
        [self.nombre.as_deref(), self.apellido.as_deref()]
            .iter()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Another school located on the same predio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedSchool {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub nombre: String,
    pub cue: Cue,
}

/// Educational program attached to a CUE
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationalProgram {
    pub programa: String,
}

/// Enrollment figures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    /// Total enrolled students
    pub matricula: Option<i64>,
    /// Enrolled boys
    pub varones: Option<i64>,
    /// Enrolled girls
    pub mujeres: Option<i64>,
    pub secciones: Option<i64>,
    /// Shifts, e.g. "Mañana, Tarde"
    pub turnos: Option<String>,
}

/// PNCE (national connectivity plan) status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PnceConnectivity {
    pub proveedor_internet_pnce: Option<String>,
    pub fecha_instalacion_pnce: Option<String>,
    pub pnce_tipo_mejora: Option<String>,
    pub pnce_fecha_mejora: Option<String>,
    pub pnce_estado: Option<String>,
    /// Contracted bandwidth
    pub mb: Option<String>,
}

/// PBA (provincial connectivity plan) status across its rollout groups
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PbaConnectivity {
    pub estado_instalacion_pba: Option<String>,
    pub proveedor_asignado_pba: Option<String>,
    pub pba_2019_proveedor_internet: Option<String>,
    pub pba_2019_fecha_instalacion: Option<String>,
    pub pba_2019_estado: Option<String>,
    pub pba_grupo_1_proveedor_internet: Option<String>,
    pub pba_grupo_1_fecha_instalacion: Option<String>,
    pub pba_grupo_1_estado: Option<String>,
    pub pba_grupo_2_a_proveedor_internet: Option<String>,
    pub pba_grupo_2_a_fecha_instalacion: Option<String>,
    pub pba_grupo_2_a_tipo_mejora: Option<String>,
    pub pba_grupo_2_a_fecha_mejora: Option<String>,
    pub pba_grupo_2_a_estado: Option<String>,
}

/// Technology floor and infrastructure upgrades
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Infrastructure {
    pub plan_piso_tecnologico: Option<String>,
    pub proveedor_piso_tecnologico_cue: Option<String>,
    pub fecha_terminado_piso_tecnologico_cue: Option<String>,
    pub tipo_piso_instalado: Option<String>,
    pub tipo_mejora: Option<String>,
    pub fecha_mejora: Option<String>,
}

/// Link plan and miscellaneous connectivity bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkPlan {
    pub plan_enlace: Option<String>,
    pub subplan_enlace: Option<String>,
    pub fecha_inicio_conectividad: Option<String>,
    pub recurso_primario: Option<String>,
    pub access_id: Option<String>,
    pub listado_conexion_internet: Option<String>,
    pub reclamos_grupo_1_ani: Option<String>,
    pub observaciones: Option<String>,
}

/// One establishment row plus its enrichment attachments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub cue: Cue,
    pub predio: Option<Predio>,
    pub nombre: String,

    pub distrito: Option<String>,
    pub ciudad: Option<String>,
    pub direccion: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,

    pub tipo_establecimiento: Option<String>,
    /// Urban or rural setting
    pub ambito: Option<String>,
    pub nivel: Option<String>,
    pub modalidad: Option<String>,
    pub tipo: Option<String>,
    pub cue_anterior: Option<String>,
    /// District supervisor in charge
    pub fed_a_cargo: Option<String>,

    #[serde(flatten)]
    pub enrollment: Enrollment,
    #[serde(flatten)]
    pub pnce: PnceConnectivity,
    #[serde(flatten)]
    pub pba: PbaConnectivity,
    #[serde(flatten)]
    pub infrastructure: Infrastructure,
    #[serde(flatten)]
    pub link: LinkPlan,

    /// Embedded relation as returned by the store
    #[serde(default, skip_serializing)]
    pub contactos: Vec<Contact>,

    #[serde(default)]
    pub contacto: Option<Contact>,
    #[serde(default)]
    pub programas_educativos: Vec<EducationalProgram>,
    #[serde(default, rename = "sharedPredioSchools")]
    pub shared_predio_schools: Vec<SharedSchool>,
}

impl SchoolRecord {
    /// Minimal record for tests
    #[cfg(test)]
    pub fn new(id: impl Into<String>, cue: Cue, nombre: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cue,
            predio: None,
            nombre: nombre.into(),
            distrito: None,
            ciudad: None,
            direccion: None,
            lat: None,
            lon: None,
            tipo_establecimiento: None,
            ambito: None,
            nivel: None,
            modalidad: None,
            tipo: None,
            cue_anterior: None,
            fed_a_cargo: None,
            enrollment: Enrollment::default(),
            pnce: PnceConnectivity::default(),
            pba: PbaConnectivity::default(),
            infrastructure: Infrastructure::default(),
            link: LinkPlan::default(),
            contactos: Vec::new(),
            contacto: None,
            programas_educativos: Vec::new(),
            shared_predio_schools: Vec::new(),
        }
    }

    /// Reset enrichment attachments; the contact comes from the embedded relation
    pub fn reset_enrichment(&mut self) {
        self.contacto = self.contactos.first().cloned();
        self.programas_educativos.clear();
        self.shared_predio_schools.clear();
    }

    /// Short one-line summary used in result lists
    pub fn summary_line(&self) -> String {
        let mut line = format!("**{}** · CUE {}", self.nombre, self.cue);
        if let Some(predio) = self.predio {
            line.push_str(&format!(" · Predio {}", predio));
        }
        let place: Vec<&str> = [self.ciudad.as_deref(), self.distrito.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect();
        if !place.is_empty() {
            line.push_str(&format!(" · {}", place.join(", ")));
        }
        line
    }

    /// Full markdown view of the record
    pub fn to_markdown(&self) -> String {
        let mut md = format!("# {}\n\n", self.nombre);

        md.push_str("## Identification\n\n");
        push_field(&mut md, "CUE", Some(&self.cue.to_string()));
        push_field(&mut md, "Predio", self.predio.map(|p| p.to_string()).as_deref());
        push_field(&mut md, "Previous CUE", self.cue_anterior.as_deref());
        push_field(&mut md, "Type", self.tipo_establecimiento.as_deref());
        push_field(&mut md, "Level", self.nivel.as_deref());
        push_field(&mut md, "Modality", self.modalidad.as_deref());
        push_field(&mut md, "Setting", self.ambito.as_deref());
        push_field(&mut md, "FED in charge", self.fed_a_cargo.as_deref());

        md.push_str("\n## Location\n\n");
        push_field(&mut md, "District", self.distrito.as_deref());
        push_field(&mut md, "City", self.ciudad.as_deref());
        push_field(&mut md, "Address", self.direccion.as_deref());
        if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            md.push_str(&format!("- **Coordinates:** {:.6}, {:.6}\n", lat, lon));
        }

        md.push_str("\n## Enrollment\n\n");
        let e = &self.enrollment;
        push_field(&mut md, "Students", e.matricula.map(|n| n.to_string()).as_deref());
        push_field(&mut md, "Boys", e.varones.map(|n| n.to_string()).as_deref());
        push_field(&mut md, "Girls", e.mujeres.map(|n| n.to_string()).as_deref());
        push_field(&mut md, "Sections", e.secciones.map(|n| n.to_string()).as_deref());
        push_field(&mut md, "Shifts", e.turnos.as_deref());

        md.push_str("\n## Connectivity\n\n");
        push_field(&mut md, "PNCE provider", self.pnce.proveedor_internet_pnce.as_deref());
        push_field(&mut md, "PNCE status", self.pnce.pnce_estado.as_deref());
        push_field(&mut md, "PNCE installed", self.pnce.fecha_instalacion_pnce.as_deref());
        push_field(&mut md, "Bandwidth (MB)", self.pnce.mb.as_deref());
        push_field(&mut md, "PBA status", self.pba.estado_instalacion_pba.as_deref());
        push_field(&mut md, "PBA provider", self.pba.proveedor_asignado_pba.as_deref());
        push_field(&mut md, "Link plan", self.link.plan_enlace.as_deref());
        push_field(&mut md, "Link subplan", self.link.subplan_enlace.as_deref());
        push_field(&mut md, "Primary resource", self.link.recurso_primario.as_deref());
        push_field(&mut md, "Technology floor", self.infrastructure.plan_piso_tecnologico.as_deref());
        push_field(&mut md, "Floor type", self.infrastructure.tipo_piso_instalado.as_deref());
        push_field(&mut md, "Notes", self.link.observaciones.as_deref());

        if let Some(contact) = &self.contacto {
            md.push_str("\n## Contact\n\n");
            let name = contact.full_name();
            push_field(&mut md, "Name", Some(name.as_str()).filter(|n| !n.is_empty()));
            push_field(&mut md, "Role", contact.cargo.as_deref());
            push_field(&mut md, "Phone", contact.telefono.as_deref());
            push_field(&mut md, "Email", contact.correo.as_deref());
        }

        if !self.programas_educativos.is_empty() {
            md.push_str("\n## Educational programs\n\n");
            for program in &self.programas_educativos {
                md.push_str(&format!("- {}\n", program.programa));
            }
        }

        if !self.shared_predio_schools.is_empty() {
            md.push_str("\n## Shares predio with\n\n");
            for school in &self.shared_predio_schools {
                md.push_str(&format!("- {} (CUE {})\n", school.nombre, school.cue));
            }
        }

        md
    }
}

fn push_field(md: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        md.push_str(&format!("- **{}:** {}\n", label, value));
    }
}

/// Accept ids stored either as text or as integers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
    })
}
