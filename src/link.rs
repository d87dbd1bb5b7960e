//! Construcción de ejecutables.
//!
//! Una vez que se ha emitido código ensamblador, este puede ser
//! ensamblado y enlazado para producir un binario ejecutable. Ambas
//! operaciones se delegan a un driver de compilador de C externo
//! (`cc` por defecto), que recibe el ensamblador por stdin.

use std::{
    ffi::OsStr,
    io::BufWriter,
    path::Path,
    process::{Child, ChildStdin, Command, ExitStatus, Stdio},
};

use bitflags::bitflags;
use thiserror::Error;
use tracing::debug;

/// Driver de enlazado predeterminado.
pub const DEFAULT_LINKER: &str = "cc";

bitflags! {
    /// Opciones a aplicar durante el enlazado.
    pub struct LinkOptions: u32 {
        /// Remover símbolos de depuración del ejecutable final.
        const STRIP = 0x01;

        /// Enlazar estáticamente.
        const STATIC = 0x02;
    }
}

/// Un error de ensamblado o enlazado.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LinkerError {
    /// Ocurrió un evento de error de E/S durante la invocación
    /// de comandos externos.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// El enlazador inició su ejecución, pero falló en enlazar.
    #[error("Linker exited with status code {0:?}")]
    Failed(ExitStatus),
}

/// Instancia del enlazador para un ejecutable definido.
pub struct Linker {
    child: Child,
    stdin: BufWriter<ChildStdin>,
}

impl Linker {
    /// Inicia una instancia del enlazador.
    ///
    /// El enlazador tratará de emitir un ejecutable y escribirlo a
    /// la ruta indicada por `output`.
    pub fn spawn<C, O>(command: C, output: &O, opts: LinkOptions) -> Result<Self, LinkerError>
    where
        C: AsRef<OsStr>,
        O: AsRef<Path>,
    {
        let mut command = Self::command(command, output, opts);
        debug!(?command, "spawning linker");

        let mut child = command.spawn()?;
        let stdin = match child.stdin.take() {
            Some(stdin) => BufWriter::new(stdin),
            None => {
                let _ = child.kill();
                return Err(LinkerError::Io(std::io::ErrorKind::BrokenPipe.into()));
            }
        };

        Ok(Linker { child, stdin })
    }

    /// Obtiene la entrada estándar del proceso que espera recibir ensamblador.
    pub fn stdin(&mut self) -> &mut BufWriter<ChildStdin> {
        &mut self.stdin
    }

    /// Indica el fin del flujo de código y finaliza el enlazado.
    pub fn finish(mut self) -> Result<(), LinkerError> {
        // El enlazador no termina hasta encontrar EOF en su entrada
        self.stdin.into_inner().map_err(|error| error.into_error())?;

        let status = self.child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(LinkerError::Failed(status))
        }
    }

    fn command<C, O>(command: C, output: &O, opts: LinkOptions) -> Command
    where
        C: AsRef<OsStr>,
        O: AsRef<Path>,
    {
        let mut command = Command::new(command);
        command
            .arg("-o")
            .arg(output.as_ref())
            // Se asume entrada en ensamblador desde stdin
            .args(&["-xassembler", "-"])
            .stdin(Stdio::piped());

        if opts.contains(LinkOptions::STRIP) {
            command.arg("-s");
        }

        if opts.contains(LinkOptions::STATIC) {
            command.arg("-static");
        }

        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(opts: LinkOptions) -> Vec<String> {
        Linker::command(DEFAULT_LINKER, &"a.out", opts)
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn plain_link() {
        assert_eq!(args(LinkOptions::empty()), ["-o", "a.out", "-xassembler", "-"]);
    }

    #[test]
    fn options_append_flags() {
        let args = args(LinkOptions::STRIP | LinkOptions::STATIC);
        assert!(args.ends_with(&["-s".to_owned(), "-static".to_owned()]));
    }

    #[test]
    fn missing_linker_is_an_io_error() {
        let result = Linker::spawn("/nonexistent/stackcc-linker", &"a.out", LinkOptions::empty());
        assert!(matches!(result, Err(LinkerError::Io(_))));
    }
}
