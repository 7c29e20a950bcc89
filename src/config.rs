//! Typed model of a FOMOD installer configuration
//!
//! `ModuleConfig.xml` is parsed once into these structures; the engine never
//! looks at XML again. `info.xml` contributes the descriptive
//! [`ModuleMetadata`].
//!
//! Missing required elements or attributes and unknown enum spellings are
//! reported as [`ConfigError`] before an installer is ever constructed.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::types::{FileState, GroupKind, Operator, Order, PluginKind};
use crate::xml::{Element, parse_document};

/// Errors raised while locating or reading installer configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Malformed XML: {0}")]
    Xml(String),

    #[error("Unexpected root element <{found}>, expected <{expected}>")]
    UnexpectedRoot { expected: String, found: String },

    #[error("<{parent}> is missing required element <{element}>")]
    MissingElement { parent: String, element: String },

    #[error("<{element}> is missing required attribute \"{attribute}\"")]
    MissingAttribute { element: String, attribute: String },

    #[error("<{element}> has invalid {attribute} \"{value}\"")]
    InvalidValue {
        element: String,
        attribute: String,
        value: String,
    },

    #[error("Installer file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read {}: {message}", path.display())]
    Read { path: PathBuf, message: String },
}

impl ConfigError {
    pub fn xml(msg: impl Into<String>) -> Self {
        Self::Xml(msg.into())
    }

    fn missing_element(parent: &Element, element: &str) -> Self {
        Self::MissingElement {
            parent: parent.name.clone(),
            element: element.to_string(),
        }
    }
}

// ============================================================================
// Dependency Trees
// ============================================================================

/// A node of a dependency tree (`moduleDependencies`, `visible`, patterns)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyNode {
    /// Target application must be at least this version
    Version { min_version: String },
    /// File under the destination must be in this state
    File { path: String, state: FileState },
    /// Flag must currently hold exactly this value
    Flag { name: String, value: String },
    /// Nested group combined with `operator`
    Composite {
        operator: Operator,
        children: Vec<DependencyNode>,
    },
}

// ============================================================================
// Files, Flags, Plugins
// ============================================================================

/// One `file` or `folder` entry of a file list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInstall {
    pub source: String,
    pub destination: String,
    pub priority: i64,
}

/// One `flag` of a plugin's `conditionFlags`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionFlag {
    pub name: String,
    pub value: String,
}

/// A conditional plugin type: applies when `dependencies` are met
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypePattern {
    pub dependencies: Option<DependencyNode>,
    pub kind: PluginKind,
}

/// How a plugin's kind is determined
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// `<type name="..."/>`
    Fixed(PluginKind),
    /// `<dependencyType>`: first matching pattern, else `default`
    Conditional {
        default: PluginKind,
        patterns: Vec<TypePattern>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfig {
    pub name: String,
    pub description: String,
    pub image: String,
    pub type_descriptor: TypeDescriptor,
    pub files: Vec<FileInstall>,
    pub flags: Vec<ConditionFlag>,
}

/// A container whose children are presented in `order`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedList<T> {
    pub order: Order,
    pub items: Vec<T>,
}

impl<T> Default for OrderedList<T> {
    fn default() -> Self {
        Self {
            order: Order::default(),
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupConfig {
    pub name: String,
    pub kind: GroupKind,
    pub plugins: OrderedList<PluginConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepConfig {
    pub name: String,
    pub visible: Option<DependencyNode>,
    pub groups: OrderedList<GroupConfig>,
}

/// A `conditionalFileInstalls` pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalInstall {
    pub dependencies: Option<DependencyNode>,
    pub files: Vec<FileInstall>,
}

/// Parsed `ModuleConfig.xml`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleConfig {
    pub module_name: String,
    pub module_image: String,
    pub module_dependencies: Option<DependencyNode>,
    pub required_files: Vec<FileInstall>,
    pub install_steps: OrderedList<StepConfig>,
    pub conditional_installs: Vec<ConditionalInstall>,
}

/// Descriptive information shown before installation starts
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct ModuleMetadata {
    pub name: String,
    pub author: String,
    pub version: String,
    pub description: String,
    pub website: String,
    pub image: String,
}

/// Things with a `name` attribute, sortable by [`Order`]
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for StepConfig {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for GroupConfig {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for PluginConfig {
    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Parsing
// ============================================================================

fn required_attr<'a>(element: &'a Element, attribute: &str) -> Result<&'a str, ConfigError> {
    element
        .attr(attribute)
        .ok_or_else(|| ConfigError::MissingAttribute {
            element: element.name.clone(),
            attribute: attribute.to_string(),
        })
}

fn parse_enum<T: FromStr>(element: &Element, attribute: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        element: element.name.clone(),
        attribute: attribute.to_string(),
        value: value.to_string(),
    })
}

fn enum_attr<T: FromStr>(element: &Element, attribute: &str) -> Result<T, ConfigError> {
    parse_enum(element, attribute, required_attr(element, attribute)?)
}

fn order_attr(element: &Element) -> Result<Order, ConfigError> {
    match element.attr("order") {
        Some(value) => parse_enum(element, "order", value),
        None => Ok(Order::default()),
    }
}

/// Parse a composite dependency element (`dependencies`, `visible`, ...)
pub fn parse_dependencies(element: &Element) -> Result<DependencyNode, ConfigError> {
    let operator = match element.attr("operator") {
        Some(value) => parse_enum(element, "operator", value)?,
        None => Operator::default(),
    };

    let mut children = Vec::new();
    for check in element.children() {
        let node = match check.name.as_str() {
            "gameDependency" => DependencyNode::Version {
                min_version: required_attr(check, "version")?.to_string(),
            },
            "fileDependency" => DependencyNode::File {
                path: required_attr(check, "file")?.to_string(),
                state: enum_attr(check, "state")?,
            },
            "flagDependency" => DependencyNode::Flag {
                name: required_attr(check, "flag")?.to_string(),
                value: required_attr(check, "value")?.to_string(),
            },
            "dependencies" => parse_dependencies(check)?,
            other => {
                // fommDependency, foseDependency and friends cannot be checked here
                debug!(element = other, "ignoring unsupported dependency check");
                continue;
            }
        };
        children.push(node);
    }

    Ok(DependencyNode::Composite { operator, children })
}

fn parse_optional_dependencies(
    parent: &Element,
    name: &str,
) -> Result<Option<DependencyNode>, ConfigError> {
    parent.child(name).map(parse_dependencies).transpose()
}

fn parse_file_list(list: Option<&Element>) -> Result<Vec<FileInstall>, ConfigError> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };

    let mut files = Vec::new();
    for item in list.children() {
        if item.name != "file" && item.name != "folder" {
            continue;
        }
        let source = required_attr(item, "source")?.to_string();
        let destination = item
            .attr("destination")
            .map(str::to_string)
            .unwrap_or_else(|| source.clone());
        let priority = match item.attr("priority") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                element: item.name.clone(),
                attribute: "priority".to_string(),
                value: value.to_string(),
            })?,
            None => 0,
        };
        files.push(FileInstall {
            source,
            destination,
            priority,
        });
    }
    Ok(files)
}

fn parse_flags(list: Option<&Element>) -> Result<Vec<ConditionFlag>, ConfigError> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };
    list.children_named("flag")
        .map(|flag| {
            Ok(ConditionFlag {
                name: required_attr(flag, "name")?.to_string(),
                value: flag.text().to_string(),
            })
        })
        .collect()
}

fn parse_type_descriptor(plugin: &Element) -> Result<TypeDescriptor, ConfigError> {
    let descriptor = plugin
        .child("typeDescriptor")
        .ok_or_else(|| ConfigError::missing_element(plugin, "typeDescriptor"))?;

    if let Some(fixed) = descriptor.child("type") {
        return Ok(TypeDescriptor::Fixed(enum_attr(fixed, "name")?));
    }

    let dependency_type = descriptor
        .child("dependencyType")
        .ok_or_else(|| ConfigError::missing_element(descriptor, "type"))?;
    let default_type = dependency_type
        .child("defaultType")
        .ok_or_else(|| ConfigError::missing_element(dependency_type, "defaultType"))?;

    let mut patterns = Vec::new();
    if let Some(list) = dependency_type.child("patterns") {
        for pattern in list.children_named("pattern") {
            let kind = pattern
                .child("type")
                .ok_or_else(|| ConfigError::missing_element(pattern, "type"))?;
            patterns.push(TypePattern {
                dependencies: parse_optional_dependencies(pattern, "dependencies")?,
                kind: enum_attr(kind, "name")?,
            });
        }
    }

    Ok(TypeDescriptor::Conditional {
        default: enum_attr(default_type, "name")?,
        patterns,
    })
}

fn parse_plugin(plugin: &Element) -> Result<PluginConfig, ConfigError> {
    Ok(PluginConfig {
        name: required_attr(plugin, "name")?.to_string(),
        description: plugin.child_text("description"),
        image: plugin
            .child("image")
            .and_then(|image| image.attr("path"))
            .unwrap_or_default()
            .to_string(),
        type_descriptor: parse_type_descriptor(plugin)?,
        files: parse_file_list(plugin.child("files"))?,
        flags: parse_flags(plugin.child("conditionFlags"))?,
    })
}

fn parse_group(group: &Element) -> Result<GroupConfig, ConfigError> {
    let plugins = match group.child("plugins") {
        Some(list) => OrderedList {
            order: order_attr(list)?,
            items: list
                .children_named("plugin")
                .map(parse_plugin)
                .collect::<Result<_, _>>()?,
        },
        None => OrderedList::default(),
    };

    Ok(GroupConfig {
        name: required_attr(group, "name")?.to_string(),
        kind: enum_attr(group, "type")?,
        plugins,
    })
}

fn parse_step(step: &Element) -> Result<StepConfig, ConfigError> {
    let groups = match step.child("optionalFileGroups") {
        Some(list) => OrderedList {
            order: order_attr(list)?,
            items: list
                .children_named("group")
                .map(parse_group)
                .collect::<Result<_, _>>()?,
        },
        None => OrderedList::default(),
    };

    Ok(StepConfig {
        name: required_attr(step, "name")?.to_string(),
        visible: parse_optional_dependencies(step, "visible")?,
        groups,
    })
}

impl ModuleConfig {
    /// Parse the contents of a `ModuleConfig.xml`
    pub fn from_xml(source: &str) -> Result<Self, ConfigError> {
        let root = parse_document(source)?;
        if root.name != "config" {
            return Err(ConfigError::UnexpectedRoot {
                expected: "config".to_string(),
                found: root.name,
            });
        }

        let install_steps = match root.child("installSteps") {
            Some(list) => OrderedList {
                order: order_attr(list)?,
                items: list
                    .children_named("installStep")
                    .map(parse_step)
                    .collect::<Result<_, _>>()?,
            },
            None => OrderedList::default(),
        };

        let mut conditional_installs = Vec::new();
        if let Some(patterns) = root
            .child("conditionalFileInstalls")
            .and_then(|installs| installs.child("patterns"))
        {
            for pattern in patterns.children_named("pattern") {
                conditional_installs.push(ConditionalInstall {
                    dependencies: parse_optional_dependencies(pattern, "dependencies")?,
                    files: parse_file_list(pattern.child("files"))?,
                });
            }
        }

        let config = Self {
            module_name: root.child_text("moduleName"),
            module_image: root
                .child("moduleImage")
                .and_then(|image| image.attr("path"))
                .unwrap_or_default()
                .to_string(),
            module_dependencies: parse_optional_dependencies(&root, "moduleDependencies")?,
            required_files: parse_file_list(root.child("requiredInstallFiles"))?,
            install_steps,
            conditional_installs,
        };

        debug!(
            module = %config.module_name,
            steps = config.install_steps.items.len(),
            conditional = config.conditional_installs.len(),
            "parsed module configuration"
        );
        Ok(config)
    }

    /// Read and parse a `ModuleConfig.xml` from disk
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_xml(&read_file(path.as_ref())?)
    }
}

impl ModuleMetadata {
    /// Combine `info.xml` contents with the module name/image of the config
    pub fn from_xml(info_source: &str, config: &ModuleConfig) -> Result<Self, ConfigError> {
        let info = parse_document(info_source)?;
        Ok(Self {
            name: config.module_name.clone(),
            author: info.child_text("Author"),
            version: info.child_text("Version"),
            description: info.child_text("Description"),
            website: info.child_text("Website"),
            image: config.module_image.clone(),
        })
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P, config: &ModuleConfig) -> Result<Self, ConfigError> {
        Self::from_xml(&read_file(path.as_ref())?, config)
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    decode_text(&bytes).ok_or_else(|| ConfigError::Read {
        path: path.to_path_buf(),
        message: "file is neither UTF-8 nor UTF-16".to_string(),
    })
}

/// FOMOD tools write both UTF-8 and UTF-16 (with BOM) files
fn decode_text(bytes: &[u8]) -> Option<String> {
    let utf16 = |rest: &[u8], from: fn([u8; 2]) -> u16| {
        if rest.len() % 2 != 0 {
            return None;
        }
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| from([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units).ok()
    };

    match bytes {
        [0xFF, 0xFE, rest @ ..] => utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => utf16(rest, u16::from_be_bytes),
        _ => String::from_utf8(bytes.to_vec()).ok(),
    }
}
