// https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.16

use log::trace;

use crate::{
    attributes::{
        Annotation, AnnotationsAttribute, ElementValue, ElementValuePair, LocalVarTarget,
        ParameterAnnotationsAttribute, TargetInfo, TypeAnnotation, TypeAnnotationsAttribute,
        TypePathEntry, TARGET_TYPE_ERROR_IN_ATTRIBUTE,
    },
    error::ErrorCode,
    ClassFileError, Result,
};

use super::Parser;

impl<'a> Parser<'a> {
    /// Reads a RuntimeVisibleAnnotations or RuntimeInvisibleAnnotations payload that
    /// starts at `start`. A payload that does not decode, or does not end exactly at
    /// `start + length`, is kept as raw bytes instead. Unlike the parameter and type
    /// annotation forms, this copy carries no sentinel byte.
    pub(super) fn parse_annotations_attribute(
        &mut self,
        start: u32,
        length: u32,
    ) -> Result<AnnotationsAttribute> {
        let count = self.read_u16()?;
        self.arena.allocate_array::<Annotation>(count as usize)?;

        match self.parse_annotations(count) {
            Ok(annotations) if self.ends_at(start, length) => Ok(AnnotationsAttribute {
                annotations,
                raw_data: Vec::new(),
            }),
            Err(e) if !e.is_recoverable() => Err(e),
            _ => {
                trace!("Malformed annotations at {}, keeping raw bytes", start);
                let raw_data = self.reread_raw(start, length)?;
                Ok(AnnotationsAttribute {
                    annotations: Vec::new(),
                    raw_data,
                })
            }
        }
    }

    pub(super) fn parse_parameter_annotations_attribute(
        &mut self,
        start: u32,
        length: u32,
    ) -> Result<ParameterAnnotationsAttribute> {
        let number_of_parameters = self.read_u8()?;

        let parsed = (0..number_of_parameters)
            .map(|_| {
                let count = self.read_u16()?;
                self.arena.allocate_array::<Annotation>(count as usize)?;
                self.parse_annotations(count)
            })
            .collect::<Result<Vec<_>>>();

        match parsed {
            Ok(parameter_annotations)
                if number_of_parameters != 0 && self.ends_at(start, length) =>
            {
                Ok(ParameterAnnotationsAttribute {
                    number_of_parameters,
                    parameter_annotations,
                    raw_data: Vec::new(),
                })
            }
            Err(e) if !e.is_recoverable() => Err(e),
            _ => {
                trace!("Malformed parameter annotations at {}, keeping raw bytes", start);
                let mut raw_data = self.reread_raw(start, length)?;
                // A leading zero parameter count marks the copy as bad
                if raw_data.first() != Some(&0) {
                    self.arena.allocate(1)?;
                    raw_data.insert(0, 0);
                }
                Ok(ParameterAnnotationsAttribute {
                    number_of_parameters: raw_data[0],
                    parameter_annotations: Vec::new(),
                    raw_data,
                })
            }
        }
    }

    pub(super) fn parse_type_annotations_attribute(
        &mut self,
        start: u32,
        length: u32,
    ) -> Result<TypeAnnotationsAttribute> {
        let count = self.read_u16()?;
        self.arena
            .allocate_array::<TypeAnnotation>(count as usize)?;

        let parsed = (0..count)
            .map(|_| self.parse_type_annotation())
            .collect::<Result<Vec<_>>>();

        match parsed {
            Ok(type_annotations) if self.ends_at(start, length) => Ok(TypeAnnotationsAttribute {
                type_annotations,
                raw_data: Vec::new(),
            }),
            Err(e) if !e.is_recoverable() => Err(e),
            _ => {
                trace!("Malformed type annotations at {}, keeping raw bytes", start);
                let mut raw_data = self.reread_raw(start, length)?;
                // The first target type after the count becomes the error marker
                if raw_data.get(2) != Some(&TARGET_TYPE_ERROR_IN_ATTRIBUTE) {
                    self.arena.allocate(1)?;
                    let at = raw_data.len().min(2);
                    raw_data.insert(at, TARGET_TYPE_ERROR_IN_ATTRIBUTE);
                }
                Ok(TypeAnnotationsAttribute {
                    type_annotations: Vec::new(),
                    raw_data,
                })
            }
        }
    }

    pub(super) fn parse_annotations(&mut self, count: u16) -> Result<Vec<Annotation>> {
        (0..count).map(|_| self.parse_annotation()).collect()
    }

    fn parse_annotation(&mut self) -> Result<Annotation> {
        let offset = self.position();
        self.ensure(4)?;
        let type_index = self.read_u16()?;
        if type_index >= self.constant_pool_count {
            return Err(ClassFileError::format(ErrorCode::InvalidAnnotation, offset));
        }

        let pairs_count = self.read_u16()?;
        self.arena
            .allocate_array::<ElementValuePair>(pairs_count as usize)?;
        let element_value_pairs = (0..pairs_count)
            .map(|_| {
                let element_name_index = self.read_u16()?;
                let value = self.parse_element_value()?;
                Ok(ElementValuePair {
                    element_name_index,
                    value,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Annotation {
            type_index,
            element_value_pairs,
        })
    }

    pub(super) fn parse_element_value(&mut self) -> Result<ElementValue> {
        let offset = self.position();
        let tag = self.read_u8()?;
        self.arena.allocate(std::mem::size_of::<ElementValue>())?;

        Ok(match tag {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => ElementValue::Const {
                tag,
                const_value_index: self.read_u16()?,
            },
            b'e' => {
                self.ensure(4)?;
                ElementValue::Enum {
                    type_name_index: self.read_u16()?,
                    const_name_index: self.read_u16()?,
                }
            }
            b'c' => ElementValue::Class {
                class_info_index: self.read_u16()?,
            },
            b'@' => ElementValue::Annotation(self.parse_annotation()?),
            b'[' => {
                let count = self.read_u16()?;
                let values = (0..count)
                    .map(|_| self.parse_element_value())
                    .collect::<Result<Vec<_>>>()?;
                ElementValue::Array(values)
            }
            _ => {
                return Err(ClassFileError::format(
                    ErrorCode::InvalidAnnotation,
                    offset,
                ))
            }
        })
    }

    // https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7.20
    fn parse_type_annotation(&mut self) -> Result<TypeAnnotation> {
        let offset = self.position();
        let target_type = self.read_u8()?;

        let target_info = match target_type {
            0x00 | 0x01 => TargetInfo::TypeParameter {
                type_parameter_index: self.read_u8()?,
            },
            0x10 => TargetInfo::Supertype {
                supertype_index: self.read_u16()?,
            },
            0x11 | 0x12 => {
                self.ensure(2)?;
                TargetInfo::TypeParameterBound {
                    type_parameter_index: self.read_u8()?,
                    bound_index: self.read_u8()?,
                }
            }
            0x13..=0x15 => TargetInfo::Empty,
            0x16 => TargetInfo::FormalParameter {
                formal_parameter_index: self.read_u8()?,
            },
            0x17 => TargetInfo::Throws {
                throws_type_index: self.read_u16()?,
            },
            0x40 | 0x41 => {
                let table_length = self.read_u16()?;
                self.arena
                    .allocate_array::<LocalVarTarget>(table_length as usize)?;
                let table = (0..table_length)
                    .map(|_| {
                        self.ensure(6)?;
                        Ok(LocalVarTarget {
                            start_pc: self.read_u16()?,
                            length: self.read_u16()?,
                            index: self.read_u16()?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                TargetInfo::LocalVar(table)
            }
            0x42 => TargetInfo::Catch {
                exception_table_index: self.read_u16()?,
            },
            0x43..=0x46 => TargetInfo::Offset {
                offset: self.read_u16()?,
            },
            0x47..=0x4b => {
                self.ensure(3)?;
                TargetInfo::TypeArgument {
                    offset: self.read_u16()?,
                    type_argument_index: self.read_u8()?,
                }
            }
            _ => {
                return Err(ClassFileError::format(
                    ErrorCode::InvalidTypeAnnotationTarget,
                    offset,
                ))
            }
        };

        let path_length = self.read_u8()?;
        self.arena
            .allocate_array::<TypePathEntry>(path_length as usize)?;
        let type_path = (0..path_length)
            .map(|_| {
                self.ensure(2)?;
                Ok(TypePathEntry {
                    type_path_kind: self.read_u8()?,
                    type_argument_index: self.read_u8()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let annotation = self.parse_annotation()?;

        Ok(TypeAnnotation {
            target_type,
            target_info,
            type_path,
            annotation,
        })
    }

    fn ends_at(&self, start: u32, length: u32) -> bool {
        u64::from(self.position()) == u64::from(start) + u64::from(length)
    }

    /// Rewinds to `start` and copies the attribute payload verbatim.
    fn reread_raw(&mut self, start: u32, length: u32) -> Result<Vec<u8>> {
        self.seek(start);
        self.arena.allocate(length as usize)?;
        Ok(self.read_bytes(length as usize)?.to_vec())
    }
}

#[cfg(test)]
mod parse_annotations_attribute_tests {
    use super::*;
    use crate::ReadOptions;

    fn parser(bytes: &[u8]) -> Parser<'_> {
        let mut parser = Parser::new(bytes, ReadOptions::default());
        parser.constant_pool_count = 10;
        parser
    }

    #[test]
    fn it_should_decode_a_well_formed_payload() {
        // one annotation of type #5 with a single int element #6 = #7
        let bytes = [0, 1, 0, 5, 0, 1, 0, 6, b'I', 0, 7];
        let attribute = parser(&bytes)
            .parse_annotations_attribute(0, bytes.len() as u32)
            .unwrap();

        assert!(attribute.is_well_formed());
        assert_eq!(
            attribute.annotations,
            vec![Annotation {
                type_index: 5,
                element_value_pairs: vec![ElementValuePair {
                    element_name_index: 6,
                    value: ElementValue::Const {
                        tag: b'I',
                        const_value_index: 7
                    },
                }],
            }]
        );
    }

    #[test]
    fn it_should_keep_the_raw_bytes_of_an_out_of_range_type() {
        let bytes = [0, 1, 0, 10, 0, 0];
        let mut parser = parser(&bytes);
        let attribute = parser.parse_annotations_attribute(0, 6).unwrap();

        assert!(attribute.annotations.is_empty());
        assert_eq!(attribute.raw_data, bytes);
        assert_eq!(parser.position(), 6);
    }

    #[test]
    fn it_should_keep_the_raw_bytes_of_an_unknown_element_tag() {
        let bytes = [0, 1, 0, 5, 0, 1, 0, 6, b'x', 0, 7];
        let attribute = parser(&bytes).parse_annotations_attribute(0, 11).unwrap();
        assert_eq!(attribute.raw_data_length(), 11);
    }

    #[test]
    fn it_should_keep_the_raw_bytes_when_the_payload_is_shorter_than_declared() {
        // Zero annotations, two trailing bytes
        let bytes = [0, 0, 0xaa, 0xbb];
        let mut parser = parser(&bytes);
        let attribute = parser.parse_annotations_attribute(0, 4).unwrap();
        assert_eq!(attribute.raw_data, bytes);
        assert_eq!(parser.position(), 4);
    }

    #[test]
    fn it_should_fail_when_the_raw_copy_runs_past_the_input() {
        let bytes = [0, 1, 0, 5];
        assert_eq!(
            parser(&bytes).parse_annotations_attribute(0, 8),
            Err(ClassFileError::format(ErrorCode::UnexpectedEof, 0))
        );
    }

    #[test]
    fn it_should_report_running_out_of_space() {
        let bytes = [0, 1, 0, 5, 0, 0];
        let mut parser = Parser::new(
            &bytes,
            ReadOptions {
                segment_size: 4,
                ..ReadOptions::default()
            },
        );
        parser.constant_pool_count = 10;
        assert_eq!(
            parser
                .parse_annotations_attribute(0, 6)
                .unwrap_err()
                .result_code(),
            -2
        );
    }
}
