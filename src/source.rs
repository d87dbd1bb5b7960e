//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el compilador construye
//! deben llevar cuenta de rangos de ubicaciones en el código fuente
//! original, lo cual permite determinar el punto exacto en donde
//! ocurre un error. Las ubicaciones se expresan como desplazamientos
//! en bytes; no se toma en cuenta el ancho de caracteres multibyte.

use std::{
    fmt::{self, Debug, Display, Formatter},
    io::{self, Read},
    ops::Range,
    rc::Rc,
};

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Descompone y toma ownership de las dos partes.
    pub fn split(self) -> (Location, T) {
        (self.location, self.value)
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    /// Transforma el valor con la misma ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            location: self.location,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// Una ubicación está conformada por un origen y un rango de bytes.
#[derive(Clone)]
pub struct Location {
    from: Rc<Source>,
    position: Range<usize>,
}

impl Location {
    /// Construye una ubicación dentro de un origen.
    pub fn new(from: &Rc<Source>, position: Range<usize>) -> Self {
        Location {
            from: Rc::clone(from),
            position,
        }
    }

    /// Unifica un rango de ubicaciones. Se asume el mismo origen.
    pub fn span(from: Location, to: &Location) -> Self {
        Location {
            from: from.from,
            position: from.position.start..to.position.end,
        }
    }

    /// Desplazamiento en bytes del inicio de la ubicación.
    pub fn offset(&self) -> usize {
        self.position.start
    }

    /// Longitud en bytes.
    pub fn len(&self) -> usize {
        self.position.end - self.position.start
    }

    /// Determina si la ubicación no abarca ningún byte (fin de entrada).
    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    /// Texto original que abarca la ubicación.
    pub fn text(&self) -> &str {
        &self.from.text[self.position.clone()]
    }

    /// Obtiene el origen.
    pub fn source(&self) -> &Source {
        &self.from
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.from, &other.from) && self.position == other.position
    }
}

impl Eq for Location {}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:", self.from.name)?;

        let Range { start, end } = self.position;
        if end <= start + 1 {
            write!(formatter, "{}", start)
        } else {
            write!(formatter, "[{}-{}]", start, end - 1)
        }
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Nombre de origen y texto completo de un programa.
pub struct Source {
    name: String,
    text: String,
}

impl Source {
    /// Crea un origen a partir de texto en memoria.
    pub fn new<N, T>(name: N, text: T) -> Rc<Self>
    where
        N: Into<String>,
        T: Into<String>,
    {
        Rc::new(Source {
            name: name.into(),
            text: text.into(),
        })
    }

    /// Lee un origen completo desde un flujo de entrada.
    pub fn read<R, N>(mut reader: R, name: N) -> io::Result<Rc<Self>>
    where
        R: Read,
        N: Into<String>,
    {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;

        Ok(Source::new(name, text))
    }

    /// Nombre con el que se identifica el origen.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Texto completo.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Localiza la línea que contiene a un desplazamiento.
    ///
    /// Retorna el texto de la línea, sin terminador, y el desplazamiento
    /// en bytes del punto indicado relativo al inicio de esa línea.
    /// Un desplazamiento igual a la longitud del texto (fin de entrada)
    /// pertenece a la última línea. Si el texto termina en un salto de
    /// línea, el fin de entrada se ubica al final de la línea previa.
    pub fn line_at(&self, offset: usize) -> (&str, usize) {
        let mut offset = offset.min(self.text.len());
        if offset == self.text.len() && self.text.ends_with('\n') {
            offset -= 1;
        }

        let start = self.text[..offset].rfind('\n').map_or(0, |newline| newline + 1);
        let end = self.text[offset..]
            .find('\n')
            .map_or(self.text.len(), |newline| offset + newline);

        let line = &self.text[start..end];
        let line = line.strip_suffix('\r').unwrap_or(line);

        (line, (offset - start).min(line.len()))
    }
}
