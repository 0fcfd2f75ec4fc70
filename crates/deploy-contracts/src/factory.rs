use {
    crate::{artifact::Artifact, error::DeploymentError},
    alloy::{
        dyn_abi::{DynSolValue, JsonAbiExt, Specifier},
        json_abi::JsonAbi,
        primitives::Bytes,
    },
    anyhow::{Context, Result, ensure},
};

/// Deploys new instances of one artifact with a fixed set of constructor
/// arguments.
#[derive(Debug, Clone)]
pub struct ContractFactory {
    artifact: Artifact,
    constructor_args: Vec<u8>,
}

impl ContractFactory {
    /// Creates a factory for `artifact`. The arguments are given in their
    /// human readable form and coerced to the types the constructor expects,
    /// e.g. `"1000"` for a `uint256` or `"[1,2]"` for a `uint8[]`.
    pub fn new(artifact: Artifact, args: &[String]) -> Result<Self, DeploymentError> {
        let constructor_args = encode_constructor_args(&artifact.abi, args).map_err(|source| {
            DeploymentError::ConstructorArgs {
                contract: artifact.name.clone(),
                source,
            }
        })?;
        Ok(Self {
            artifact,
            constructor_args,
        })
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    /// The data of the contract creation transaction: the artifact's bytecode
    /// followed by the ABI encoded constructor arguments.
    pub fn creation_code(&self) -> Bytes {
        [
            self.artifact.bytecode.as_ref(),
            self.constructor_args.as_slice(),
        ]
        .concat()
        .into()
    }
}

fn encode_constructor_args(abi: &JsonAbi, args: &[String]) -> Result<Vec<u8>> {
    let Some(constructor) = abi.constructor() else {
        ensure!(
            args.is_empty(),
            "contract has no constructor but {} arguments were given",
            args.len()
        );
        return Ok(Vec::new());
    };
    ensure!(
        constructor.inputs.len() == args.len(),
        "constructor expects {} arguments but {} were given",
        constructor.inputs.len(),
        args.len()
    );

    let values = constructor
        .inputs
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty = param
                .resolve()
                .with_context(|| format!("unsupported type {:?}", param.ty))?;
            ty.coerce_str(arg)
                .with_context(|| format!("cannot use {arg:?} as {} {:?}", param.ty, param.name))
        })
        .collect::<Result<Vec<DynSolValue>>>()?;

    constructor
        .abi_encode_input(&values)
        .context("failed to encode constructor arguments")
}
