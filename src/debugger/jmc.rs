//! Just-my-code classification.
//!
//! Each class is classified once, when the runtime reports it is loaded. Classification
//! drives two things: the stepper never stops inside infrastructure code and the default
//! stack trace view hides infrastructure frames.

use crate::debugger::debugee::{ClassInfo, ClassRef, Debugee, FunctionRef, MethodInfo};
use crate::debugger::error::Error;
use crate::{muted_error, sd_debug, weak_error};
use serde::Deserialize;
use std::collections::HashMap;

/// Namespace of runtime generated types, they implement class semantics only.
pub const GENERATED_TYPE_PREFIX: &str = "IronPython.NewTypes";

/// Infrastructure method names, such methods are never user code.
pub const INFRASTRUCTURE_METHODS: &[&str] = &[
    "TryGetExtraValue",
    "TrySetExtraValue",
    ".cctor",
    ".ctor",
    "CustomSymbolDictionary.GetExtraKeys",
    "IModuleDictionaryInitialization.InitializeModuleDictionary",
];

/// Classification rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct JmcPolicy {
    pub generated_type_prefix: String,
    pub infrastructure_methods: Vec<String>,
}

impl Default for JmcPolicy {
    fn default() -> Self {
        Self {
            generated_type_prefix: GENERATED_TYPE_PREFIX.to_string(),
            infrastructure_methods: INFRASTRUCTURE_METHODS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassRecord {
    pub is_user_code: bool,
    /// Per method overrides, method token to user code flag.
    pub methods: HashMap<u32, bool>,
}

impl ClassRecord {
    pub fn is_user_method(&self, token: u32) -> bool {
        self.methods.get(&token).copied().unwrap_or(self.is_user_code)
    }
}

/// Classification result of all loaded classes.
#[derive(Default)]
pub struct JmcRegistry {
    policy: JmcPolicy,
    classes: HashMap<ClassRef, ClassRecord>,
}

impl JmcRegistry {
    pub fn new(policy: JmcPolicy) -> Self {
        Self {
            policy,
            classes: HashMap::new(),
        }
    }

    /// Decide if a class is a user code.
    ///
    /// 1. classes from non dynamic modules are infrastructure
    /// 2. classes from generated type namespace are infrastructure
    /// 3. other classes are user code, except methods from the infrastructure list
    pub fn classify(&self, class: &ClassInfo, methods: &[MethodInfo]) -> ClassRecord {
        if !class.module.is_dynamic || class.name.starts_with(&self.policy.generated_type_prefix)
        {
            return ClassRecord::default();
        }

        let methods = methods
            .iter()
            .filter(|m| self.policy.infrastructure_methods.contains(&m.name))
            .map(|m| (m.function.token, false))
            .collect();
        ClassRecord {
            is_user_code: true,
            methods,
        }
    }

    /// Classify loaded class and transfer decision into the runtime.
    ///
    /// Metadata errors never abort a session, a class without metadata is classified by
    /// module and name only.
    pub fn on_class_load(
        &mut self,
        debugee: &mut dyn Debugee,
        class: &ClassInfo,
    ) -> Result<&ClassRecord, Error> {
        let methods = if class.module.is_dynamic {
            weak_error!(
                debugee.class_methods(class.class),
                "class methods unavailable:"
            )
            .unwrap_or_default()
        } else {
            vec![]
        };

        let record = self.classify(class, &methods);
        debugee.set_class_jmc(class.class, record.is_user_code)?;
        for (token, user_code) in &record.methods {
            let function = FunctionRef::new(class.class.module, *token);
            muted_error!(debugee.set_function_jmc(function, *user_code));
        }

        sd_debug!(
            target: "debugger",
            "class {} user code: {}, infrastructure methods: {}",
            class.name,
            record.is_user_code,
            record.methods.len()
        );
        self.classes.insert(class.class, record);
        Ok(&self.classes[&class.class])
    }

    pub fn record(&self, class: ClassRef) -> Option<&ClassRecord> {
        self.classes.get(&class)
    }

    /// Return true if a method is a user code, unknown classes are infrastructure.
    pub fn is_user_method(&self, method: &MethodInfo) -> bool {
        self.record(method.class())
            .map(|r| r.is_user_method(method.function.token))
            .unwrap_or(false)
    }
}
