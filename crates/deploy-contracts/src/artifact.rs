//! Lookup of compiled contract artifacts.
//!
//! Artifacts are the JSON files written by the Solidity toolchains. Two
//! layouts are understood:
//! - Hardhat: `<root>/contracts/<File>.sol/<Name>.json` carrying
//!   `contractName`, `sourceName`, `abi` and `bytecode` as a hex string.
//! - Foundry: `<root>/<File>.sol/<Name>.json` carrying `abi` and the hex
//!   encoded creation code in `bytecode.object`.
//!
//! Debug files (`<Name>.dbg.json`) and the `build-info` directory never match.

use {
    alloy::{
        json_abi::JsonAbi,
        primitives::{Bytes, hex},
    },
    serde::Deserialize,
    std::{
        ffi::OsStr,
        fs,
        path::{Path, PathBuf},
    },
};

const BUILD_INFO_DIR: &str = "build-info";
/// Solidity leaves `__$<hash>$__` (or `__<Library>___` for old compilers)
/// in the bytecode where library addresses still have to be linked.
const LINK_PLACEHOLDER: &str = "__";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("no artifact found for contract {0:?}, was it compiled?")]
    NotFound(String),
    #[error(
        "contract {0:?} has no deployable bytecode, it is abstract, an interface or needs \
         library linking"
    )]
    NotCompiled(String),
    #[error("multiple artifacts match {name:?}, use one of the fully qualified names {candidates:?}")]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },
    #[error("malformed artifact {path:?}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A compiled contract ready to be deployed.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    /// Solidity file the contract was defined in, if the artifact records it.
    pub source_name: Option<String>,
    pub abi: JsonAbi,
    /// Creation code without constructor arguments.
    pub bytecode: Bytes,
}

impl Artifact {
    pub fn fully_qualified_name(&self) -> String {
        fully_qualified_name(self.source_name.as_deref(), &self.name)
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Finds the artifact for `name`, which is either a bare contract name
    /// (`Token`) or a fully qualified one (`contracts/Token.sol:Token`).
    pub fn resolve(&self, name: &str) -> Result<Artifact, ArtifactError> {
        let query = Query::parse(name);
        let mut candidates = Vec::new();
        if self.root.is_dir() {
            collect(&self.root, &query, &mut candidates)?;
        }

        let candidate = match <[Candidate; 1]>::try_from(candidates) {
            Ok([candidate]) => candidate,
            Err(candidates) if candidates.is_empty() => {
                return Err(ArtifactError::NotFound(name.to_owned()));
            }
            Err(candidates) => {
                let mut candidates: Vec<_> = candidates
                    .iter()
                    .map(|candidate| {
                        fully_qualified_name(candidate.source_name.as_deref(), &candidate.name)
                    })
                    .collect();
                candidates.sort();
                return Err(ArtifactError::Ambiguous {
                    name: name.to_owned(),
                    candidates,
                });
            }
        };

        tracing::debug!(path = ?candidate.path, "resolved artifact");
        let bytecode = decode_bytecode(&candidate)?;
        Ok(Artifact {
            name: candidate.name,
            source_name: candidate.source_name,
            abi: candidate.abi,
            bytecode,
        })
    }
}

struct Query<'a> {
    source: Option<&'a str>,
    contract: &'a str,
    file_name: String,
}

impl<'a> Query<'a> {
    fn parse(name: &'a str) -> Self {
        let (source, contract) = match name.rsplit_once(':') {
            Some((source, contract)) => (Some(source), contract),
            None => (None, name),
        };
        Self {
            source,
            contract,
            file_name: format!("{contract}.json"),
        }
    }

    fn matches_source(&self, source_name: Option<&str>) -> bool {
        let Some(wanted) = self.source else {
            return true;
        };
        let Some(actual) = source_name else {
            return false;
        };
        // Foundry only records the file name of the source, not its path.
        actual == wanted
            || (!actual.contains('/') && Path::new(wanted).file_name() == Some(OsStr::new(actual)))
    }
}

struct Candidate {
    path: PathBuf,
    name: String,
    source_name: Option<String>,
    abi: JsonAbi,
    bytecode: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    contract_name: Option<String>,
    source_name: Option<String>,
    abi: JsonAbi,
    bytecode: RawBytecode,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBytecode {
    Hex(String),
    Object { object: String },
}

fn collect(dir: &Path, query: &Query, found: &mut Vec<Candidate>) -> Result<(), ArtifactError> {
    let io_error = |source| ArtifactError::Io {
        path: dir.to_owned(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let path = entry.path();
        // Symlinked directories are not followed, they may form cycles.
        if entry.file_type().map_err(io_error)?.is_dir() {
            if path.file_name() != Some(OsStr::new(BUILD_INFO_DIR)) {
                collect(&path, query, found)?;
            }
        } else if path.file_name() == Some(OsStr::new(&query.file_name)) {
            if let Some(candidate) = read_candidate(path, query)? {
                found.push(candidate);
            }
        }
    }
    Ok(())
}

fn read_candidate(path: PathBuf, query: &Query) -> Result<Option<Candidate>, ArtifactError> {
    let data = fs::read_to_string(&path).map_err(|source| ArtifactError::Io {
        path: path.clone(),
        source,
    })?;
    let raw = match serde_json::from_str::<RawArtifact>(&data) {
        Ok(raw) => raw,
        Err(err) => {
            return Err(ArtifactError::Malformed {
                path,
                source: err.into(),
            });
        }
    };

    if raw
        .contract_name
        .as_deref()
        .is_some_and(|name| name != query.contract)
    {
        return Ok(None);
    }
    let source_name = raw.source_name.or_else(|| {
        path.parent()
            .and_then(Path::file_name)
            .and_then(OsStr::to_str)
            .filter(|dir| dir.ends_with(".sol"))
            .map(str::to_owned)
    });
    if !query.matches_source(source_name.as_deref()) {
        return Ok(None);
    }

    let bytecode = match raw.bytecode {
        RawBytecode::Hex(code) | RawBytecode::Object { object: code } => code,
    };
    Ok(Some(Candidate {
        path,
        name: query.contract.to_owned(),
        source_name,
        abi: raw.abi,
        bytecode,
    }))
}

fn decode_bytecode(candidate: &Candidate) -> Result<Bytes, ArtifactError> {
    let not_compiled = || {
        ArtifactError::NotCompiled(fully_qualified_name(
            candidate.source_name.as_deref(),
            &candidate.name,
        ))
    };
    let code = candidate.bytecode.trim();
    if code.contains(LINK_PLACEHOLDER) {
        return Err(not_compiled());
    }
    let bytecode = hex::decode(code).map_err(|err| ArtifactError::Malformed {
        path: candidate.path.clone(),
        source: anyhow::Error::new(err).context("invalid bytecode"),
    })?;
    if bytecode.is_empty() {
        return Err(not_compiled());
    }
    Ok(bytecode.into())
}

fn fully_qualified_name(source_name: Option<&str>, name: &str) -> String {
    match source_name {
        Some(source) => format!("{source}:{name}"),
        None => name.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json, tempfile::TempDir};

    fn write(root: &Path, relative: &str, content: &serde_json::Value) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content.to_string()).unwrap();
    }

    fn hardhat(name: &str, source: &str, bytecode: &str) -> serde_json::Value {
        json!({
            "_format": "hh-sol-artifact-1",
            "contractName": name,
            "sourceName": source,
            "abi": [],
            "bytecode": bytecode,
            "deployedBytecode": "0x",
            "linkReferences": {},
            "deployedLinkReferences": {},
        })
    }

    #[test]
    fn resolves_hardhat_artifact() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "contracts/ChainBattles.sol/ChainBattles.json",
            &hardhat("ChainBattles", "contracts/ChainBattles.sol", "0x6080604052"),
        );
        write(
            dir.path(),
            "contracts/ChainBattles.sol/ChainBattles.dbg.json",
            &json!({ "_format": "hh-sol-dbg-1", "buildInfo": "../../build-info/abc.json" }),
        );
        write(dir.path(), "build-info/ChainBattles.json", &json!({}));

        let artifact = ArtifactStore::new(dir.path())
            .resolve("ChainBattles")
            .unwrap();

        assert_eq!(artifact.name, "ChainBattles");
        assert_eq!(
            artifact.fully_qualified_name(),
            "contracts/ChainBattles.sol:ChainBattles"
        );
        assert_eq!(artifact.bytecode.as_ref(), [0x60, 0x80, 0x60, 0x40, 0x52]);
    }

    #[test]
    fn resolves_foundry_artifact() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "Counter.sol/Counter.json",
            &json!({
                "abi": [],
                "bytecode": { "object": "0x6080", "sourceMap": "", "linkReferences": {} },
                "deployedBytecode": { "object": "0x" },
            }),
        );

        let store = ArtifactStore::new(dir.path());
        let artifact = store.resolve("Counter").unwrap();
        assert_eq!(artifact.source_name.as_deref(), Some("Counter.sol"));
        assert_eq!(artifact.bytecode.as_ref(), [0x60, 0x80]);

        let artifact = store.resolve("src/Counter.sol:Counter").unwrap();
        assert_eq!(artifact.name, "Counter");
    }

    #[test]
    fn ambiguous_names_need_qualification() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "contracts/a/Token.sol/Token.json",
            &hardhat("Token", "contracts/a/Token.sol", "0x01"),
        );
        write(
            dir.path(),
            "contracts/b/Token.sol/Token.json",
            &hardhat("Token", "contracts/b/Token.sol", "0x02"),
        );
        let store = ArtifactStore::new(dir.path());

        let err = store.resolve("Token").unwrap_err();
        match err {
            ArtifactError::Ambiguous { name, candidates } => {
                assert_eq!(name, "Token");
                assert_eq!(
                    candidates,
                    [
                        "contracts/a/Token.sol:Token",
                        "contracts/b/Token.sol:Token"
                    ]
                );
            }
            err => panic!("unexpected error {err:?}"),
        }

        let artifact = store.resolve("contracts/b/Token.sol:Token").unwrap();
        assert_eq!(artifact.bytecode.as_ref(), [0x02]);
    }

    #[test]
    fn missing_artifacts_are_not_found() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "contracts/Token.sol/Token.json",
            &hardhat("Token", "contracts/Token.sol", "0x01"),
        );

        assert!(matches!(
            ArtifactStore::new(dir.path()).resolve("ChainBattles"),
            Err(ArtifactError::NotFound(name)) if name == "ChainBattles"
        ));
        assert!(matches!(
            ArtifactStore::new(dir.path().join("missing")).resolve("Token"),
            Err(ArtifactError::NotFound(_))
        ));
        assert!(matches!(
            ArtifactStore::new(dir.path()).resolve("contracts/Other.sol:Token"),
            Err(ArtifactError::NotFound(_))
        ));
    }

    #[test]
    fn interfaces_and_unlinked_contracts_are_not_compiled() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "contracts/IToken.sol/IToken.json",
            &hardhat("IToken", "contracts/IToken.sol", "0x"),
        );
        write(
            dir.path(),
            "contracts/Linked.sol/Linked.json",
            &hardhat(
                "Linked",
                "contracts/Linked.sol",
                "0x6080__$1234567890abcdef1234567890abcdef12$__6080",
            ),
        );
        let store = ArtifactStore::new(dir.path());

        assert!(matches!(
            store.resolve("IToken"),
            Err(ArtifactError::NotCompiled(name)) if name == "contracts/IToken.sol:IToken"
        ));
        assert!(matches!(
            store.resolve("Linked"),
            Err(ArtifactError::NotCompiled(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn ignores_symlinked_directories() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "contracts/Token.sol/Token.json",
            &hardhat("Token", "contracts/Token.sol", "0x01"),
        );
        std::os::unix::fs::symlink(dir.path(), dir.path().join("contracts/loop")).unwrap();

        let artifact = ArtifactStore::new(dir.path()).resolve("Token").unwrap();
        assert_eq!(artifact.bytecode.as_ref(), [0x01]);
    }

    #[test]
    fn reports_malformed_artifacts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("contracts/Token.sol/Token.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        match ArtifactStore::new(dir.path()).resolve("Token") {
            Err(ArtifactError::Malformed { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
